pub(crate) mod a;
pub(crate) mod aaaa;
pub(crate) mod nsec;
pub(crate) mod ptr;
pub(crate) mod srv;
pub(crate) mod txt;

use std::fmt;

use super::name::*;
use super::packer::*;
use super::*;
use crate::record::RecordData;
use shared::error::*;

// A Resource is a DNS resource record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Resource {
    pub(crate) header: ResourceHeader,
    pub(crate) data: RecordData,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dnsmessage.Resource{{Header: {}, Body: {}}}",
            self.header, self.data
        )
    }
}

impl Resource {
    // pack appends the wire format of the Resource to msg.
    pub(crate) fn pack(&mut self, msg: Vec<u8>) -> Result<Vec<u8>> {
        self.header.typ = self.data.typ();
        let (mut msg, len_off) = self.header.pack(msg)?;
        let pre_len = msg.len();
        msg = pack_record_data(&self.data, msg)?;
        self.header.fix_len(&mut msg, len_off, pre_len)?;
        Ok(msg)
    }
}

/// Header for a DNS resource record.
///
/// # Wire Format
///
/// ```text
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                      NAME                     |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                      TYPE                     |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |CF|                  CLASS                     |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                      TTL                      |
/// |                                               |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                   RDLENGTH                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                     RDATA                     |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
///
/// `CF` is the mDNS cache-flush bit (RFC 6762 section 10.2).
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub(crate) struct ResourceHeader {
    /// The domain name for which this resource record pertains.
    pub(crate) name: Name,

    /// The type of DNS resource record.
    ///
    /// This field will be set automatically during packing.
    pub(crate) typ: DnsType,

    /// The type code exactly as read from the wire, kept for types that
    /// [`DnsType`] does not model.
    pub(crate) raw_typ: u16,

    /// The class, cache-flush bit included.
    pub(crate) class: DnsClass,

    /// Time to live in seconds. Zero announces that the record is gone.
    pub(crate) ttl: u32,

    /// Length of the resource data (RDATA) following this header.
    ///
    /// This field will be set automatically during packing.
    pub(crate) length: u16,
}

impl fmt::Display for ResourceHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dnsmessage.ResourceHeader{{Name: {}, Type: {}, Class: {}, TTL: {}, Length: {}}}",
            self.name, self.typ, self.class, self.ttl, self.length,
        )
    }
}

impl ResourceHeader {
    // pack appends the wire format of the ResourceHeader to msg.
    //
    // len_off is the offset in msg where the Length field was packed.
    pub(crate) fn pack(&self, mut msg: Vec<u8>) -> Result<(Vec<u8>, usize)> {
        msg = self.name.pack(msg)?;
        msg = self.typ.pack(msg);
        msg = self.class.pack(msg);
        msg = pack_uint32(msg, self.ttl);
        let len_off = msg.len();
        msg = pack_uint16(msg, self.length);
        Ok((msg, len_off))
    }

    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize) -> Result<usize> {
        let mut new_off = self.name.unpack(msg, off)?;
        let (raw_typ, o) = unpack_uint16(msg, new_off)?;
        self.raw_typ = raw_typ;
        self.typ = DnsType::from(raw_typ);
        new_off = self.class.unpack(msg, o)?;
        let (ttl, new_off) = unpack_uint32(msg, new_off)?;
        self.ttl = ttl;
        let (l, new_off) = unpack_uint16(msg, new_off)?;
        self.length = l;

        Ok(new_off)
    }

    // fix_len updates a packed ResourceHeader to include the length of the
    // record data.
    //
    // len_off is the offset of the ResourceHeader.length field in msg.
    //
    // pre_len is the length that msg was before the record data was packed.
    pub(crate) fn fix_len(&mut self, msg: &mut [u8], len_off: usize, pre_len: usize) -> Result<()> {
        if msg.len() < pre_len || msg.len() > pre_len + u16::MAX as usize {
            return Err(Error::ErrResTooLong);
        }

        let con_len = msg.len() - pre_len;

        // Fill in the length now that we know how long the content is.
        msg[len_off] = ((con_len >> 8) & 0xFF) as u8;
        msg[len_off + 1] = (con_len & 0xFF) as u8;
        self.length = con_len as u16;

        Ok(())
    }
}

// pack_record_data appends the wire format of the record payload to msg.
pub(crate) fn pack_record_data(data: &RecordData, msg: Vec<u8>) -> Result<Vec<u8>> {
    match data {
        RecordData::A(ip) => Ok(a::pack(ip, msg)),
        RecordData::Aaaa(ip) => Ok(aaaa::pack(ip, msg)),
        RecordData::Cname(target) | RecordData::Ptr(target) => ptr::pack(target, msg),
        RecordData::Txt(txt) => txt::pack(txt, msg),
        RecordData::Srv(srv) => srv::pack(srv, msg),
        RecordData::Nsec(nsec) => nsec::pack(nsec, msg),
    }
}

// unpack_record_data decodes `length` bytes of payload at `off` according
// to the record type. Names inside the payload may point anywhere in msg.
pub(crate) fn unpack_record_data(
    header: &ResourceHeader,
    msg: &[u8],
    off: usize,
) -> Result<(RecordData, usize)> {
    let length = header.length as usize;
    match header.typ {
        DnsType::A => {
            let (ip, off) = a::unpack(msg, off, length)?;
            Ok((RecordData::A(ip), off))
        }
        DnsType::Aaaa => {
            let (ip, off) = aaaa::unpack(msg, off, length)?;
            Ok((RecordData::Aaaa(ip), off))
        }
        DnsType::Cname => {
            let (target, off) = ptr::unpack(msg, off)?;
            Ok((RecordData::Cname(target), off))
        }
        DnsType::Ptr => {
            let (target, off) = ptr::unpack(msg, off)?;
            Ok((RecordData::Ptr(target), off))
        }
        DnsType::Txt => {
            let (txt, off) = txt::unpack(msg, off, length)?;
            Ok((RecordData::Txt(txt), off))
        }
        DnsType::Srv => {
            let (srv, off) = srv::unpack(msg, off)?;
            Ok((RecordData::Srv(srv), off))
        }
        DnsType::Nsec => {
            let (nsec, off) = nsec::unpack(msg, off, length)?;
            Ok((RecordData::Nsec(nsec), off))
        }
        _ => Err(Error::ErrUnsupportedRecordType(header.raw_typ)),
    }
}
