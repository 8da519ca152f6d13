use std::fmt;

use shared::error::*;

const NAME_LEN: usize = 255;
const LABEL_LEN: usize = 63;
const MAX_POINTERS: usize = 10;

// A Name is a non-encoded, fully qualified domain name (trailing root dot
// included).
#[derive(Default, PartialEq, Eq, Clone, Debug)]
pub(crate) struct Name {
    pub(crate) data: String,
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data)
    }
}

impl Name {
    /// Builds a fully qualified name from a dotted string; the trailing root
    /// dot is optional on input and always present in the result.
    pub(crate) fn new(data: &str) -> Result<Self> {
        let data = if data.ends_with('.') {
            data.to_owned()
        } else {
            format!("{data}.")
        };
        if data.len() > NAME_LEN {
            return Err(Error::ErrNameTooLong);
        }
        Ok(Name { data })
    }

    /// The name without its trailing root dot, as handed to callers.
    pub(crate) fn to_dotted(&self) -> String {
        self.data.trim_end_matches('.').to_owned()
    }

    // pack appends the wire format of the Name to msg.
    //
    // Names are written uncompressed: every query carries a single name and
    // compression only matters for larger responses.
    pub(crate) fn pack(&self, mut msg: Vec<u8>) -> Result<Vec<u8>> {
        // Emit sequence of counted strings, chopping at dots.
        let trimmed = self.data.trim_end_matches('.');
        if !trimmed.is_empty() {
            for label in trimmed.split('.') {
                if label.is_empty() {
                    return Err(Error::ErrZeroSegLen);
                }
                if label.len() > LABEL_LEN {
                    return Err(Error::ErrSegTooLong);
                }
                msg.push(label.len() as u8);
                msg.extend_from_slice(label.as_bytes());
            }
        }
        msg.push(0);
        Ok(msg)
    }

    // unpack unpacks a domain name, following compression pointers.
    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize) -> Result<usize> {
        // curr_off is the current working offset.
        let mut curr_off = off;

        // new_off is the offset where the next record will start. Pointers lead
        // to data that belongs to other names and thus doesn't count towards to
        // the usage of this name.
        let mut new_off = off;

        // ptr is the number of pointers followed.
        let mut ptr = 0;

        let mut name = String::new();

        loop {
            if curr_off >= msg.len() {
                return Err(Error::ErrBaseLen);
            }
            let c = msg[curr_off] as usize;
            curr_off += 1;
            match c & 0xC0 {
                0x00 => {
                    // String segment
                    if c == 0x00 {
                        // A zero length signals the end of the name.
                        break;
                    }
                    let end_off = curr_off + c;
                    if end_off > msg.len() {
                        return Err(Error::ErrCalcLen);
                    }
                    name.push_str(&String::from_utf8_lossy(&msg[curr_off..end_off]));
                    name.push('.');
                    curr_off = end_off;
                }
                0xC0 => {
                    // Pointer
                    if curr_off >= msg.len() {
                        return Err(Error::ErrInvalidPtr);
                    }
                    let c1 = msg[curr_off] as usize;
                    curr_off += 1;
                    if ptr == 0 {
                        new_off = curr_off;
                    }
                    // Don't follow too many pointers, maybe there's a loop.
                    ptr += 1;
                    if ptr > MAX_POINTERS {
                        return Err(Error::ErrTooManyPtr);
                    }
                    curr_off = ((c ^ 0xC0) << 8) | c1;
                }
                _ => {
                    // Prefixes 0x80 and 0x40 are reserved.
                    return Err(Error::ErrReserved);
                }
            }
        }
        if name.is_empty() {
            name.push('.');
        }
        if name.len() > NAME_LEN {
            return Err(Error::ErrNameTooLong);
        }
        self.data = name;
        if ptr == 0 {
            new_off = curr_off;
        }
        Ok(new_off)
    }

    pub(crate) fn skip(msg: &[u8], off: usize) -> Result<usize> {
        // new_off is the offset where the next record will start. Pointers lead
        // to data that belongs to other names and thus doesn't count towards to
        // the usage of this name.
        let mut new_off = off;

        loop {
            if new_off >= msg.len() {
                return Err(Error::ErrBaseLen);
            }
            let c = msg[new_off];
            new_off += 1;
            match c & 0xC0 {
                0x00 => {
                    if c == 0x00 {
                        // A zero length signals the end of the name.
                        break;
                    }
                    // literal string
                    new_off += c as usize;
                    if new_off > msg.len() {
                        return Err(Error::ErrCalcLen);
                    }
                }
                0xC0 => {
                    // Pointer to somewhere else in msg.

                    // Pointers are two bytes.
                    new_off += 1;

                    // Don't follow the pointer as the data here has ended.
                    break;
                }
                _ => {
                    // Prefixes 0x80 and 0x40 are reserved.
                    return Err(Error::ErrReserved);
                }
            }
        }

        if new_off > msg.len() {
            return Err(Error::ErrBaseLen);
        }

        Ok(new_off)
    }
}
