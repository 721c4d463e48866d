use std::collections::BTreeMap;
use thiserror::Error;

const MAX_INPUT_SIZE: usize = 64 * 1024 * 1024;
const MAX_NESTING_DEPTH: usize = 32;
const MAX_INTEGER_DIGITS: usize = 20;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("invalid bencode: {0}")]
    InvalidFormat(String),

    #[error("nesting depth exceeded (max {})", MAX_NESTING_DEPTH)]
    NestingTooDeep,

    #[error("input too large (max {} bytes)", MAX_INPUT_SIZE)]
    InputTooLarge,

    #[error("integer out of range")]
    IntegerOutOfRange,

    #[error("trailing data after value at offset {0}")]
    TrailingData(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value<'a> {
    Integer(i64),
    Bytes(&'a [u8]),
    List(Vec<Value<'a>>),
    Dict(BTreeMap<&'a [u8], Value<'a>>),
}

impl<'a> Value<'a> {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value<'a>]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&BTreeMap<&'a [u8], Value<'a>>> {
        match self {
            Value::Dict(entries) => Some(entries),
            _ => None,
        }
    }

    /// Dictionary lookup; `None` for non-dicts and missing keys
    pub fn get(&self, key: &str) -> Option<&Value<'a>> {
        self.as_dict()?.get(key.as_bytes())
    }
}

/// Decode a single bencoded value spanning the whole input
pub fn decode(input: &[u8]) -> Result<Value<'_>, DecodeError> {
    if input.len() > MAX_INPUT_SIZE {
        return Err(DecodeError::InputTooLarge);
    }

    let mut decoder = Decoder {
        input,
        pos: 0,
        depth: 0,
    };
    let value = decoder.value()?;

    if decoder.pos != input.len() {
        return Err(DecodeError::TrailingData(decoder.pos));
    }

    Ok(value)
}

struct Decoder<'a> {
    input: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Decoder<'a> {
    fn peek(&self) -> Result<u8, DecodeError> {
        self.input
            .get(self.pos)
            .copied()
            .ok_or(DecodeError::UnexpectedEof)
    }

    fn expect(&mut self, expected: u8) -> Result<(), DecodeError> {
        let byte = self.peek()?;
        if byte != expected {
            return Err(DecodeError::InvalidFormat(format!(
                "expected '{}' at offset {}, got '{}'",
                expected as char, self.pos, byte as char
            )));
        }
        self.pos += 1;
        Ok(())
    }

    fn value(&mut self) -> Result<Value<'a>, DecodeError> {
        match self.peek()? {
            b'i' => self.integer(),
            b'l' => self.list(),
            b'd' => self.dict(),
            b'0'..=b'9' => self.bytes().map(Value::Bytes),
            other => Err(DecodeError::InvalidFormat(format!(
                "unexpected byte '{}' at offset {}",
                other as char, self.pos
            ))),
        }
    }

    fn integer(&mut self) -> Result<Value<'a>, DecodeError> {
        self.expect(b'i')?;
        let start = self.pos;

        while self.peek()? != b'e' {
            self.pos += 1;
            if self.pos - start > MAX_INTEGER_DIGITS {
                return Err(DecodeError::IntegerOutOfRange);
            }
        }

        let digits = &self.input[start..self.pos];
        self.pos += 1;

        let (negative, magnitude) = match digits.split_first() {
            Some((b'-', rest)) => (true, rest),
            _ => (false, digits),
        };

        if magnitude.is_empty() || !magnitude.iter().all(u8::is_ascii_digit) {
            return Err(DecodeError::InvalidFormat("malformed integer".to_string()));
        }
        if magnitude.len() > 1 && magnitude[0] == b'0' {
            return Err(DecodeError::InvalidFormat("leading zero in integer".to_string()));
        }
        if negative && magnitude == b"0" {
            return Err(DecodeError::InvalidFormat("negative zero".to_string()));
        }

        // Digits were checked above, so the only possible failure is overflow
        let text = std::str::from_utf8(digits)
            .map_err(|_| DecodeError::InvalidFormat("malformed integer".to_string()))?;
        text.parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| DecodeError::IntegerOutOfRange)
    }

    fn bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        let start = self.pos;
        while self.peek()?.is_ascii_digit() {
            self.pos += 1;
        }

        let length: usize = std::str::from_utf8(&self.input[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| DecodeError::InvalidFormat("malformed string length".to_string()))?;

        self.expect(b':')?;

        let end = self
            .pos
            .checked_add(length)
            .filter(|end| *end <= self.input.len())
            .ok_or(DecodeError::UnexpectedEof)?;

        let bytes = &self.input[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn enter(&mut self) -> Result<(), DecodeError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(DecodeError::NestingTooDeep);
        }
        self.depth += 1;
        Ok(())
    }

    fn list(&mut self) -> Result<Value<'a>, DecodeError> {
        self.expect(b'l')?;
        self.enter()?;

        let mut items = Vec::new();
        while self.peek()? != b'e' {
            items.push(self.value()?);
        }
        self.pos += 1;
        self.depth -= 1;

        Ok(Value::List(items))
    }

    fn dict(&mut self) -> Result<Value<'a>, DecodeError> {
        self.expect(b'd')?;
        self.enter()?;

        let mut entries = BTreeMap::new();
        while self.peek()? != b'e' {
            if !self.peek()?.is_ascii_digit() {
                return Err(DecodeError::InvalidFormat(
                    "dictionary key must be a string".to_string(),
                ));
            }
            let key = self.bytes()?;
            let value = self.value()?;
            entries.insert(key, value);
        }
        self.pos += 1;
        self.depth -= 1;

        Ok(Value::Dict(entries))
    }
}
