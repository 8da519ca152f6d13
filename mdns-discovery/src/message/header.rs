use std::fmt;

use super::packer::*;
use super::*;
use shared::error::*;

// Header is a representation of a DNS message header.
#[derive(Default, Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) struct Header {
    pub(crate) id: u16,
    pub(crate) response: bool,
    pub(crate) authoritative: bool,
    pub(crate) truncated: bool,
    pub(crate) recursion_desired: bool,
    pub(crate) recursion_available: bool,
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dnsmessage.Header{{id: {}, response: {}, authoritative: {}, truncated: {}, recursion_desired: {}, recursion_available: {}}}",
            self.id,
            self.response,
            self.authoritative,
            self.truncated,
            self.recursion_desired,
            self.recursion_available,
        )
    }
}

impl Header {
    // pack packs all of the flag bits of the header into bits.
    pub(crate) fn pack(&self) -> (u16, u16) {
        let mut bits = 0;
        if self.recursion_available {
            bits |= HEADER_BIT_RA;
        }
        if self.recursion_desired {
            bits |= HEADER_BIT_RD;
        }
        if self.truncated {
            bits |= HEADER_BIT_TC;
        }
        if self.authoritative {
            bits |= HEADER_BIT_AA;
        }
        if self.response {
            bits |= HEADER_BIT_QR;
        }

        (self.id, bits)
    }
}

// HeaderInternal is the wire layout of the header: id, flag bits and the
// four section counts.
#[derive(Default, Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) struct HeaderInternal {
    pub(crate) id: u16,
    pub(crate) bits: u16,
    pub(crate) questions: u16,
    pub(crate) answers: u16,
    pub(crate) authorities: u16,
    pub(crate) additionals: u16,
}

impl HeaderInternal {
    pub(crate) fn count(&self, sec: Section) -> u16 {
        match sec {
            Section::Questions => self.questions,
            Section::Answers => self.answers,
            Section::Authorities => self.authorities,
            Section::Additionals => self.additionals,
            _ => 0,
        }
    }

    // pack appends the wire format of the header to msg.
    pub(crate) fn pack(&self, mut msg: Vec<u8>) -> Vec<u8> {
        msg = pack_uint16(msg, self.id);
        msg = pack_uint16(msg, self.bits);
        msg = pack_uint16(msg, self.questions);
        msg = pack_uint16(msg, self.answers);
        msg = pack_uint16(msg, self.authorities);
        pack_uint16(msg, self.additionals)
    }

    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize) -> Result<usize> {
        let (id, new_off) = unpack_uint16(msg, off)?;
        self.id = id;

        let (bits, new_off) = unpack_uint16(msg, new_off)?;
        self.bits = bits;

        let (questions, new_off) = unpack_uint16(msg, new_off)?;
        self.questions = questions;

        let (answers, new_off) = unpack_uint16(msg, new_off)?;
        self.answers = answers;

        let (authorities, new_off) = unpack_uint16(msg, new_off)?;
        self.authorities = authorities;

        let (additionals, new_off) = unpack_uint16(msg, new_off)?;
        self.additionals = additionals;

        Ok(new_off)
    }

    pub(crate) fn header(&self) -> Header {
        Header {
            id: self.id,
            response: (self.bits & HEADER_BIT_QR) != 0,
            authoritative: (self.bits & HEADER_BIT_AA) != 0,
            truncated: (self.bits & HEADER_BIT_TC) != 0,
            recursion_desired: (self.bits & HEADER_BIT_RD) != 0,
            recursion_available: (self.bits & HEADER_BIT_RA) != 0,
        }
    }
}
