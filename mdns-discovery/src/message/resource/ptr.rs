use super::*;

// PTR and CNAME payloads are a single, possibly compressed, domain name.
pub(crate) fn pack(target: &str, msg: Vec<u8>) -> Result<Vec<u8>> {
    Name::new(target)?.pack(msg)
}

pub(crate) fn unpack(msg: &[u8], off: usize) -> Result<(String, usize)> {
    let mut name = Name::default();
    let off = name.unpack(msg, off)?;
    Ok((name.to_dotted(), off))
}
