use super::*;

pub(crate) fn pack(txt: &[String], mut msg: Vec<u8>) -> Result<Vec<u8>> {
    // An empty TXT record still carries one empty string (RFC 6763 section 6.1).
    if txt.is_empty() {
        msg.push(0);
        return Ok(msg);
    }
    for s in txt {
        msg = pack_str(msg, s)?;
    }
    Ok(msg)
}

pub(crate) fn unpack(msg: &[u8], mut off: usize, length: usize) -> Result<(Vec<String>, usize)> {
    let end = off + length;
    if end > msg.len() {
        return Err(Error::ErrResourceLen);
    }
    let mut txts = vec![];
    while off < end {
        let (t, new_off) = unpack_str(&msg[..end], off)?;
        off = new_off;
        if !t.is_empty() {
            txts.push(t);
        }
    }
    Ok((txts, off))
}
