use std::net::Ipv4Addr;

use super::*;

pub(crate) fn pack(ip: &Ipv4Addr, msg: Vec<u8>) -> Vec<u8> {
    pack_bytes(msg, &ip.octets())
}

pub(crate) fn unpack(msg: &[u8], off: usize, length: usize) -> Result<(Ipv4Addr, usize)> {
    if length != 4 {
        return Err(Error::ErrResourceLen);
    }
    let mut a = [0u8; 4];
    let off = unpack_bytes(msg, off, &mut a)?;
    Ok((Ipv4Addr::from(a), off))
}
