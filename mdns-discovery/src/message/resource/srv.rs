use super::*;
use crate::record::SrvData;

pub(crate) fn pack(srv: &SrvData, mut msg: Vec<u8>) -> Result<Vec<u8>> {
    msg = pack_uint16(msg, srv.priority);
    msg = pack_uint16(msg, srv.weight);
    msg = pack_uint16(msg, srv.port);
    // RFC 2782 forbids compressing the target.
    Name::new(&srv.target)?.pack(msg)
}

pub(crate) fn unpack(msg: &[u8], off: usize) -> Result<(SrvData, usize)> {
    let (priority, off) = unpack_uint16(msg, off)?;
    let (weight, off) = unpack_uint16(msg, off)?;
    let (port, off) = unpack_uint16(msg, off)?;
    let mut target = Name::default();
    let off = target.unpack(msg, off)?;
    Ok((
        SrvData {
            priority,
            weight,
            port,
            target: target.to_dotted(),
        },
        off,
    ))
}
