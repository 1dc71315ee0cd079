use std::fmt;

use crate::error::{Error, Result};

/// A-record query type.
pub const TYPE_A: u16 = 1;
/// Internet class.
pub const CLASS_INET: u16 = 1;

const HEADER_BIT_QR: u16 = 1 << 15;
const HEADER_BIT_RD: u16 = 1 << 8;

const HEADER_SIZE: usize = 12;
const NAME_LEN: usize = 255;
const MAX_POINTERS: usize = 10;

fn pack_u16(mut msg: Vec<u8>, v: u16) -> Vec<u8> {
    msg.extend_from_slice(&v.to_be_bytes());
    msg
}

fn unpack_u16(msg: &[u8], off: usize) -> Result<(u16, usize)> {
    if off + 2 > msg.len() {
        return Err(Error::ErrBaseLen);
    }
    Ok((u16::from_be_bytes([msg[off], msg[off + 1]]), off + 2))
}

/// A non-encoded domain name in canonical form (trailing dot).
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Name {
    pub data: String,
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data)
    }
}

impl Name {
    pub fn new(data: &str) -> Result<Self> {
        if data.len() > NAME_LEN {
            return Err(Error::ErrCalcLen);
        }
        Ok(Name {
            data: data.to_owned(),
        })
    }

    // pack appends the wire format of the Name to msg: a sequence of
    // counted labels terminated by a zero length label. No compression.
    pub fn pack(&self, mut msg: Vec<u8>) -> Result<Vec<u8>> {
        let data = self.data.as_bytes();

        if data.is_empty() || data[data.len() - 1] != b'.' {
            return Err(Error::ErrNonCanonicalName);
        }

        // Allow the root domain.
        if data == b"." {
            msg.push(0);
            return Ok(msg);
        }

        let mut begin = 0;
        for (i, &b) in data.iter().enumerate() {
            if b == b'.' {
                if i - begin >= 1 << 6 {
                    return Err(Error::ErrSegTooLong);
                }
                if i - begin == 0 {
                    return Err(Error::ErrZeroSegLen);
                }

                msg.push((i - begin) as u8);
                msg.extend_from_slice(&data[begin..i]);

                begin = i + 1;
            }
        }

        msg.push(0);
        Ok(msg)
    }

    // unpack reads a domain name at off, following compression pointers.
    pub fn unpack(msg: &[u8], off: usize) -> Result<(Name, usize)> {
        let mut data = String::new();
        let mut curr = off;
        // The location after the name, once a pointer was followed.
        let mut end = 0usize;
        let mut pointers = 0usize;

        loop {
            if curr >= msg.len() {
                return Err(Error::ErrBaseLen);
            }

            let c = msg[curr] as usize;
            match c & 0xc0 {
                0x00 => {
                    if c == 0 {
                        // The end of the name.
                        curr += 1;
                        break;
                    }

                    // A literal label.
                    if curr + 1 + c > msg.len() {
                        return Err(Error::ErrCalcLen);
                    }
                    for &b in &msg[curr + 1..curr + 1 + c] {
                        data.push(b as char);
                    }
                    data.push('.');
                    curr += 1 + c;
                }
                0xc0 => {
                    // A compression pointer.
                    if curr + 2 > msg.len() {
                        return Err(Error::ErrInvalidPtr);
                    }
                    if end == 0 {
                        end = curr + 2;
                    }

                    let ptr = ((c & 0x3f) << 8) | msg[curr + 1] as usize;
                    // Pointers must point backwards.
                    if ptr >= curr {
                        return Err(Error::ErrInvalidPtr);
                    }

                    pointers += 1;
                    if pointers > MAX_POINTERS {
                        return Err(Error::ErrTooManyPtr);
                    }
                    curr = ptr;
                }
                _ => return Err(Error::ErrInvalidPtr),
            }

            if data.len() > NAME_LEN {
                return Err(Error::ErrCalcLen);
            }
        }

        if data.is_empty() {
            data.push('.');
        }
        if end == 0 {
            end = curr;
        }

        Ok((Name { data }, end))
    }
}

/// A DNS query question.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub name: Name,
    pub typ: u16,
    pub class: u16,
}

impl Question {
    pub fn pack(&self, msg: Vec<u8>) -> Result<Vec<u8>> {
        let msg = self.name.pack(msg)?;
        let msg = pack_u16(msg, self.typ);
        Ok(pack_u16(msg, self.class))
    }

    pub fn unpack(msg: &[u8], off: usize) -> Result<(Question, usize)> {
        let (name, off) = Name::unpack(msg, off)?;
        let (typ, off) = unpack_u16(msg, off)?;
        let (class, off) = unpack_u16(msg, off)?;

        Ok((Question { name, typ, class }, off))
    }
}

/// The subset of a DNS message the carrier exchanges: a header and its
/// questions. Resource records in replies are never generated or
/// inspected.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: u16,
    pub response: bool,
    pub recursion_desired: bool,
    pub questions: Vec<Question>,
}

impl Message {
    /// A recursion-desired A/IN query for `fqdn`.
    pub fn query(id: u16, fqdn: &str) -> Result<Self> {
        let mut name = fqdn.to_owned();
        if !name.ends_with('.') {
            name.push('.');
        }

        Ok(Message {
            id,
            response: false,
            recursion_desired: true,
            questions: vec![Question {
                name: Name::new(&name)?,
                typ: TYPE_A,
                class: CLASS_INET,
            }],
        })
    }

    /// An empty reply to this query: same id, question echoed, no
    /// records.
    pub fn reply(&self) -> Message {
        Message {
            id: self.id,
            response: true,
            recursion_desired: self.recursion_desired,
            questions: self.questions.clone(),
        }
    }

    pub fn pack(&self) -> Result<Vec<u8>> {
        let mut bits = 0u16;
        if self.response {
            bits |= HEADER_BIT_QR;
        }
        if self.recursion_desired {
            bits |= HEADER_BIT_RD;
        }

        let mut msg = Vec::with_capacity(HEADER_SIZE);
        msg = pack_u16(msg, self.id);
        msg = pack_u16(msg, bits);
        msg = pack_u16(msg, self.questions.len() as u16);
        msg = pack_u16(msg, 0); // answers
        msg = pack_u16(msg, 0); // authorities
        msg = pack_u16(msg, 0); // additionals

        for question in &self.questions {
            msg = question.pack(msg)?;
        }

        Ok(msg)
    }

    /// Parses the header and question section; any records that follow
    /// are ignored.
    pub fn unpack(msg: &[u8]) -> Result<Self> {
        let (id, off) = unpack_u16(msg, 0)?;
        let (bits, off) = unpack_u16(msg, off)?;
        let (qdcount, off) = unpack_u16(msg, off)?;
        let (_ancount, off) = unpack_u16(msg, off)?;
        let (_nscount, off) = unpack_u16(msg, off)?;
        let (_arcount, mut off) = unpack_u16(msg, off)?;

        let mut questions = Vec::with_capacity(qdcount as usize);
        for _ in 0..qdcount {
            let (question, next) = Question::unpack(msg, off)?;
            questions.push(question);
            off = next;
        }

        Ok(Message {
            id,
            response: bits & HEADER_BIT_QR != 0,
            recursion_desired: bits & HEADER_BIT_RD != 0,
            questions,
        })
    }
}
