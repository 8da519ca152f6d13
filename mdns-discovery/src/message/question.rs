use std::fmt;

use super::name::*;
use super::*;
use shared::error::Result;

// A question is a DNS query.
#[derive(Default, Debug, PartialEq, Eq, Clone)]
pub(crate) struct Question {
    pub(crate) name: Name,
    pub(crate) typ: DnsType,
    pub(crate) class: DnsClass,
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dnsmessage.question{{Name: {}, Type: {}, Class: {}}}",
            self.name, self.typ, self.class
        )
    }
}

impl Question {
    // pack appends the wire format of the question to msg.
    pub(crate) fn pack(&self, mut msg: Vec<u8>) -> Result<Vec<u8>> {
        msg = self.name.pack(msg)?;
        msg = self.typ.pack(msg);
        Ok(self.class.pack(msg))
    }

    #[cfg(test)]
    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize) -> Result<usize> {
        let mut new_off = self.name.unpack(msg, off)?;
        new_off = self.typ.unpack(msg, new_off)?;
        self.class.unpack(msg, new_off)
    }

    pub(crate) fn skip(msg: &[u8], off: usize) -> Result<usize> {
        let mut new_off = Name::skip(msg, off)?;
        new_off = DnsType::skip(msg, new_off)?;
        DnsClass::skip(msg, new_off)
    }
}
