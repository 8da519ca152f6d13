use std::net::Ipv6Addr;

use super::*;

pub(crate) fn pack(ip: &Ipv6Addr, msg: Vec<u8>) -> Vec<u8> {
    pack_bytes(msg, &ip.octets())
}

pub(crate) fn unpack(msg: &[u8], off: usize, length: usize) -> Result<(Ipv6Addr, usize)> {
    if length != 16 {
        return Err(Error::ErrResourceLen);
    }
    let mut aaaa = [0u8; 16];
    let off = unpack_bytes(msg, off, &mut aaaa)?;
    Ok((Ipv6Addr::from(aaaa), off))
}
