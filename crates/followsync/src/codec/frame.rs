use super::{EncodeError, Field, ParseError};

/// Prefixes `payload` with its own length, itself prefixed by the number of
/// digits in that length.
///
/// `"1234"` becomes `"14" + "1234"`: one digit of length-of-length, then the
/// length `4`, then the payload.
pub fn length_wrap(payload: &str) -> String {
    let len = payload.len().to_string();
    let mut out = String::with_capacity(1 + len.len() + payload.len());
    // Payloads stay far below 10^9 characters: one digit of length-of-length.
    out.push(char::from(b'0' + len.len() as u8));
    out.push_str(&len);
    out.push_str(payload);
    out
}

/// Prefixes `payload` with a single length digit.
///
/// # Errors
///
/// Returns [`EncodeError::PayloadTooLong`] if the payload is longer than nine
/// characters.
pub fn simple_wrap(payload: &str) -> Result<String, EncodeError> {
    if payload.len() > 9 {
        return Err(EncodeError::PayloadTooLong { len: payload.len() });
    }
    let mut out = String::with_capacity(1 + payload.len());
    out.push(char::from(b'0' + payload.len() as u8));
    out.push_str(payload);
    Ok(out)
}

/// Cursor over a frame string that reads wrapped fields in order.
///
/// Each read either returns the field and advances, or returns a
/// [`ParseError`] and leaves the cursor where it was.
#[derive(Clone, Debug)]
pub struct FrameReader<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> FrameReader<'a> {
    pub const fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Byte offset of the next unread character.
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// The unread tail of the frame.
    pub fn remaining(&self) -> &'a str {
        self.input.get(self.pos..).unwrap_or_default()
    }

    /// Reads exactly `n` characters.
    pub fn take(&mut self, n: usize, field: Field) -> Result<&'a str, ParseError> {
        let end = self.pos + n;
        let slice = self.input.get(self.pos..end).ok_or(ParseError::Truncated {
            field,
            index: self.pos,
            needed: end.saturating_sub(self.input.len()).max(1),
        })?;
        self.pos = end;
        Ok(slice)
    }

    /// Reads a run of `n` ASCII digits as a number.
    fn take_number(&mut self, n: usize, field: Field) -> Result<usize, ParseError> {
        self.rewind_on_err(|r| {
            let offset = r.pos;
            let digits = r.take(n, field)?;
            parse_digits(digits, field, offset)
        })
    }

    /// Runs `read`, restoring the cursor if it fails.
    fn rewind_on_err<T>(
        &mut self,
        read: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let start = self.pos;
        let result = read(self);
        if result.is_err() {
            self.pos = start;
        }
        result
    }

    /// Reads a [`length_wrap`]ped field and returns its payload.
    pub fn read_length_wrapped(&mut self, field: Field) -> Result<&'a str, ParseError> {
        self.rewind_on_err(|r| {
            let len_len = r.take_number(1, field)?;
            let len = if len_len == 0 {
                0
            } else {
                r.take_number(len_len, field)?
            };
            r.take(len, field)
        })
    }

    /// Reads a [`simple_wrap`]ped field and returns its payload.
    pub fn read_simple_wrapped(&mut self, field: Field) -> Result<&'a str, ParseError> {
        self.rewind_on_err(|r| {
            let len = r.take_number(1, field)?;
            r.take(len, field)
        })
    }

    /// Reads a [`simple_wrap`]ped field holding a decimal number.
    pub fn read_simple_number(&mut self, field: Field) -> Result<u32, ParseError> {
        self.rewind_on_err(|r| {
            let offset = r.pos + 1;
            let digits = r.read_simple_wrapped(field)?;
            if digits.is_empty() {
                return Err(ParseError::EmptyNumber { field });
            }
            // Nine digits always fit a u32.
            parse_digits(digits, field, offset).map(|n| n as u32)
        })
    }
}

fn parse_digits(digits: &str, field: Field, offset: usize) -> Result<usize, ParseError> {
    let mut value = 0_usize;
    for (i, b) in digits.bytes().enumerate() {
        if !b.is_ascii_digit() {
            return Err(ParseError::InvalidDigit {
                field,
                index: offset + i,
            });
        }
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(usize::from(b - b'0')))
            .ok_or(ParseError::InvalidDigit {
                field,
                index: offset + i,
            })?;
    }
    Ok(value)
}

/// Splits a response chunk back into its records.
///
/// Strips `header`, then unwraps consecutive [`length_wrap`]ped records until
/// the chunk is exhausted. Returns `None` if the chunk does not start with the
/// header or a record is malformed.
pub fn split_records<'a>(chunk: &'a str, header: &str) -> Option<Vec<&'a str>> {
    let body = chunk.strip_prefix(header)?;
    let mut reader = FrameReader::new(body);
    let mut records = Vec::new();
    while !reader.remaining().is_empty() {
        records.push(reader.read_length_wrapped(Field::Identifier).ok()?);
    }
    Some(records)
}
