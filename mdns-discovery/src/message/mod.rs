//! mDNS wire codec.
//!
//! Encodes single-question queries and decodes responses into
//! [`ResourceRecord`]s. Only the record types the discovery engine cares
//! about are modelled; everything else is skipped.


pub(crate) mod header;
pub(crate) mod name;
mod packer;
pub(crate) mod parser;
pub(crate) mod question;
pub(crate) mod resource;

use std::cmp::Ordering;
use std::fmt;
use std::time::Instant;

use header::*;
use name::*;
use packer::*;
use parser::*;
use question::*;
use resource::*;

use crate::record::ResourceRecord;
use shared::error::*;

/// A DNS record or question type.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DnsType {
    // ResourceHeader.Type and question.Type
    A = 1,
    Cname = 5,
    Ptr = 12,
    Txt = 16,
    Aaaa = 28,
    Srv = 33,
    Nsec = 47,

    // question.Type
    All = 255,

    #[default]
    Unsupported = 0,
}

impl From<u16> for DnsType {
    fn from(v: u16) -> Self {
        match v {
            1 => DnsType::A,
            5 => DnsType::Cname,
            12 => DnsType::Ptr,
            16 => DnsType::Txt,
            28 => DnsType::Aaaa,
            33 => DnsType::Srv,
            47 => DnsType::Nsec,
            255 => DnsType::All,
            _ => DnsType::Unsupported,
        }
    }
}

impl fmt::Display for DnsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            DnsType::A => "A",
            DnsType::Cname => "CNAME",
            DnsType::Ptr => "PTR",
            DnsType::Txt => "TXT",
            DnsType::Aaaa => "AAAA",
            DnsType::Srv => "SRV",
            DnsType::Nsec => "NSEC",
            DnsType::All => "ALL",
            _ => "Unsupported",
        };
        write!(f, "{s}")
    }
}

// Cache keys sort by the numeric type code.
impl Ord for DnsType {
    fn cmp(&self, other: &Self) -> Ordering {
        (*self as u16).cmp(&(*other as u16))
    }
}

impl PartialOrd for DnsType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl DnsType {
    // pack appends the wire format of the type to msg.
    pub(crate) fn pack(&self, msg: Vec<u8>) -> Vec<u8> {
        pack_uint16(msg, *self as u16)
    }

    #[cfg(test)]
    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize) -> Result<usize> {
        let (t, o) = unpack_uint16(msg, off)?;
        *self = DnsType::from(t);
        Ok(o)
    }

    pub(crate) fn skip(msg: &[u8], off: usize) -> Result<usize> {
        skip_uint16(msg, off)
    }
}

/// DNS class of a question or resource record.
///
/// mDNS only uses [`DNSCLASS_INET`]. In responses the top bit is the
/// cache-flush flag ([`DNSCLASS_CACHE_FLUSH`]) and must be masked off with
/// [`DNSCLASS_MASK`] before comparing classes.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DnsClass(pub u16);

/// Internet class (IN).
pub const DNSCLASS_INET: DnsClass = DnsClass(1);

/// Any class (*), only meaningful in questions.
pub const DNSCLASS_ANY: DnsClass = DnsClass(255);

/// Cache-flush bit of the class field (RFC 6762 section 10.2).
pub const DNSCLASS_CACHE_FLUSH: u16 = 0x8000;

/// Mask that strips the cache-flush bit from a class.
pub const DNSCLASS_MASK: u16 = 0x7FFF;

impl fmt::Display for DnsClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flush = if self.0 & DNSCLASS_CACHE_FLUSH != 0 {
            "|CacheFlush"
        } else {
            ""
        };
        match DnsClass(self.0 & DNSCLASS_MASK) {
            DNSCLASS_INET => write!(f, "ClassINET{flush}"),
            DNSCLASS_ANY => write!(f, "ClassANY{flush}"),
            other => write!(f, "{}{flush}", other.0),
        }
    }
}

impl DnsClass {
    /// The class with the cache-flush bit cleared.
    pub fn masked(&self) -> DnsClass {
        DnsClass(self.0 & DNSCLASS_MASK)
    }

    // pack appends the wire format of the class to msg.
    pub(crate) fn pack(&self, msg: Vec<u8>) -> Vec<u8> {
        pack_uint16(msg, self.0)
    }

    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize) -> Result<usize> {
        let (c, o) = unpack_uint16(msg, off)?;
        *self = DnsClass(c);
        Ok(o)
    }

    pub(crate) fn skip(msg: &[u8], off: usize) -> Result<usize> {
        skip_uint16(msg, off)
    }
}

// Internal constants.

// PACK_STARTING_CAP is the default initial buffer size allocated during
// packing.
const PACK_STARTING_CAP: usize = 512;

// UINT16LEN is the length (in bytes) of a uint16.
const UINT16LEN: usize = 2;

// UINT32LEN is the length (in bytes) of a uint32.
const UINT32LEN: usize = 4;

// HEADER_LEN is the length (in bytes) of a DNS header.
//
// A header is comprised of 6 uint16s and no padding.
pub(crate) const HEADER_LEN: usize = 6 * UINT16LEN;

const HEADER_BIT_QR: u16 = 1 << 15; // query/response (response=1)
const HEADER_BIT_AA: u16 = 1 << 10; // authoritative
const HEADER_BIT_TC: u16 = 1 << 9; // truncated
const HEADER_BIT_RD: u16 = 1 << 8; // recursion desired
const HEADER_BIT_RA: u16 = 1 << 7; // recursion available

// Section marks the part of a message the parser is positioned in.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Section {
    #[default]
    NotStarted = 0,
    Header = 1,
    Questions = 2,
    Answers = 3,
    Authorities = 4,
    Additionals = 5,
    Done = 6,
}

impl Section {
    pub(crate) fn next(&self) -> Section {
        match *self {
            Section::NotStarted => Section::Header,
            Section::Header => Section::Questions,
            Section::Questions => Section::Answers,
            Section::Answers => Section::Authorities,
            Section::Authorities => Section::Additionals,
            Section::Additionals | Section::Done => Section::Done,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            Section::NotStarted => "NotStarted",
            Section::Header => "Header",
            Section::Questions => "Question",
            Section::Answers => "Answer",
            Section::Authorities => "Authority",
            Section::Additionals => "Additional",
            Section::Done => "Done",
        };
        write!(f, "{s}")
    }
}

// Message is a representation of a DNS message.
#[derive(Default, Debug)]
pub(crate) struct Message {
    pub(crate) header: Header,
    pub(crate) questions: Vec<Question>,
    pub(crate) answers: Vec<Resource>,
    pub(crate) authorities: Vec<Resource>,
    pub(crate) additionals: Vec<Resource>,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = "dnsmessage.Message{Header: ".to_owned();
        s += self.header.to_string().as_str();

        s += ", Questions: ";
        let v: Vec<String> = self.questions.iter().map(|q| q.to_string()).collect();
        s += &v.join(", ");

        s += ", Answers: ";
        let v: Vec<String> = self.answers.iter().map(|q| q.to_string()).collect();
        s += &v.join(", ");

        s += ", Authorities: ";
        let v: Vec<String> = self.authorities.iter().map(|q| q.to_string()).collect();
        s += &v.join(", ");

        s += ", Additionals: ";
        let v: Vec<String> = self.additionals.iter().map(|q| q.to_string()).collect();
        s += &v.join(", ");

        write!(f, "{s}")
    }
}

impl Message {
    // unpack parses a full Message. Unlike parse_response it fails on the
    // first malformed or unsupported record.
    #[cfg(test)]
    pub(crate) fn unpack(&mut self, msg: &[u8]) -> Result<()> {
        let mut p = Parser::default();
        self.header = p.start(msg)?;
        self.questions = p.all_questions()?;
        self.answers = p.all_resources(Section::Answers)?;
        self.authorities = p.all_resources(Section::Authorities)?;
        self.additionals = p.all_resources(Section::Additionals)?;
        Ok(())
    }

    // pack packs a full Message.
    pub(crate) fn pack(&mut self) -> Result<Vec<u8>> {
        if self.questions.len() > u16::MAX as usize
            || self.answers.len() > u16::MAX as usize
            || self.authorities.len() > u16::MAX as usize
            || self.additionals.len() > u16::MAX as usize
        {
            return Err(Error::ErrTooManyRecords);
        }

        let (id, bits) = self.header.pack();
        let h = HeaderInternal {
            id,
            bits,
            questions: self.questions.len() as u16,
            answers: self.answers.len() as u16,
            authorities: self.authorities.len() as u16,
            additionals: self.additionals.len() as u16,
        };

        let mut msg = h.pack(Vec::with_capacity(PACK_STARTING_CAP));
        for question in &self.questions {
            msg = question.pack(msg)?;
        }
        for answer in &mut self.answers {
            msg = answer.pack(msg)?;
        }
        for authority in &mut self.authorities {
            msg = authority.pack(msg)?;
        }
        for additional in &mut self.additionals {
            msg = additional.pack(msg)?;
        }

        Ok(msg)
    }
}

/// Encodes a single-question mDNS query for `name` and `typ`, class IN.
///
/// `id` of `None` picks a random message id. Recursion-desired is left
/// clear, multicast queries have no recursive resolver to ask.
pub fn build_query(id: Option<u16>, name: &str, typ: DnsType) -> Result<Vec<u8>> {
    let mut msg = Message {
        header: Header {
            id: id.unwrap_or_else(rand::random::<u16>),
            ..Default::default()
        },
        questions: vec![Question {
            name: Name::new(name)?,
            typ,
            class: DNSCLASS_INET,
        }],
        ..Default::default()
    };
    msg.pack()
}

/// Encodes an authoritative response carrying `answers` and `additionals`.
pub fn build_response(
    id: u16,
    answers: &[ResourceRecord],
    additionals: &[ResourceRecord],
) -> Result<Vec<u8>> {
    let to_resources = |records: &[ResourceRecord]| -> Result<Vec<Resource>> {
        records
            .iter()
            .map(|r| {
                Ok(Resource {
                    header: ResourceHeader {
                        name: Name::new(r.name())?,
                        typ: r.typ(),
                        raw_typ: r.typ() as u16,
                        class: r.class(),
                        ttl: r.ttl(),
                        length: 0,
                    },
                    data: r.data().clone(),
                })
            })
            .collect()
    };

    let mut msg = Message {
        header: Header {
            id,
            response: true,
            authoritative: true,
            ..Default::default()
        },
        answers: to_resources(answers)?,
        additionals: to_resources(additionals)?,
        ..Default::default()
    };
    msg.pack()
}

/// Decodes the records of an mDNS response, stamping each with
/// `created_at = now`.
///
/// Queries are rejected with [`Error::ErrNotResponse`]. A record that fails
/// to decode is skipped when the parser moved past it (unsupported types,
/// bad payloads); a record whose header cannot be read ends the walk and
/// the records decoded so far are returned.
pub fn parse_response(buf: &[u8], now: Instant) -> Result<Vec<ResourceRecord>> {
    let mut p = Parser::default();
    let header = p.start(buf)?;
    if !header.response {
        return Err(Error::ErrNotResponse);
    }
    p.skip_all_questions()?;

    let mut records = vec![];
    loop {
        let before = p.offset();
        match p.resource() {
            Ok(r) => records.push(ResourceRecord::new(
                &r.header.name.data,
                r.header.class,
                r.header.ttl,
                now,
                r.data,
            )),
            Err(Error::ErrSectionDone) => break,
            Err(err) => {
                if p.offset() > before {
                    log::trace!("skipping undecodable record: {err}");
                    continue;
                }
                log::trace!("abandoning rest of packet at offset {before}: {err}");
                break;
            }
        }
    }

    Ok(records)
}
