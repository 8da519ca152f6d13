use super::*;
use crate::record::NsecData;

const MAX_BITMAP_LEN: usize = 32;

// The NSEC payload is the next domain name followed by type bitmap blocks,
// each a window number, a length (1..=32) and that many bitmap bytes
// (RFC 4034 section 4.1.2).
pub(crate) fn pack(nsec: &NsecData, mut msg: Vec<u8>) -> Result<Vec<u8>> {
    msg = Name::new(&nsec.next_domain)?.pack(msg)?;
    for (window, bitmap) in &nsec.windows {
        if bitmap.is_empty() || bitmap.len() > MAX_BITMAP_LEN {
            return Err(Error::ErrInvalidTypeBitmap);
        }
        msg.push(*window);
        msg.push(bitmap.len() as u8);
        msg = pack_bytes(msg, bitmap);
    }
    Ok(msg)
}

pub(crate) fn unpack(msg: &[u8], off: usize, length: usize) -> Result<(NsecData, usize)> {
    let end = off + length;
    if end > msg.len() {
        return Err(Error::ErrResourceLen);
    }
    let mut next_domain = Name::default();
    let mut off = next_domain.unpack(msg, off)?;

    let mut windows = vec![];
    while off < end {
        if off + 2 > end {
            return Err(Error::ErrInvalidTypeBitmap);
        }
        let window = msg[off];
        let len = msg[off + 1] as usize;
        off += 2;
        if len == 0 || len > MAX_BITMAP_LEN || off + len > end {
            return Err(Error::ErrInvalidTypeBitmap);
        }
        windows.push((window, msg[off..off + len].to_vec()));
        off += len;
    }

    Ok((
        NsecData {
            next_domain: next_domain.to_dotted(),
            windows,
        },
        off,
    ))
}
