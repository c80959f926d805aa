use super::{
    EncodeError, Field, FrameReader, ParseError, decode_identifier, encode_identifier,
    length_wrap, simple_wrap,
};
use core::fmt;

/// The relation view a request asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Accounts the subject follows.
    Forward,
    /// Accounts following the subject.
    Reverse,
    /// Followed accounts that follow back.
    Mutual,
    /// Followed accounts that do not follow back.
    ForwardOnly,
    /// Followers the subject does not follow back.
    ReverseOnly,
}

impl RelationKind {
    /// Maps a request frame's kind digit to its view.
    pub const fn from_digit(c: char) -> Option<Self> {
        match c {
            '1' => Some(Self::Forward),
            '2' => Some(Self::Reverse),
            '3' => Some(Self::Mutual),
            '4' => Some(Self::ForwardOnly),
            '5' => Some(Self::ReverseOnly),
            _ => None,
        }
    }

    pub const fn to_digit(self) -> char {
        match self {
            Self::Forward => '1',
            Self::Reverse => '2',
            Self::Mutual => '3',
            Self::ForwardOnly => '4',
            Self::ReverseOnly => '5',
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Forward => "forward",
            Self::Reverse => "reverse",
            Self::Mutual => "mutual",
            Self::ForwardOnly => "forward-only",
            Self::ReverseOnly => "reverse-only",
        };
        f.write_str(name)
    }
}

/// A decoded request frame.
///
/// Layout: `kind` (1 digit) + length-wrapped encoded identifier +
/// simple-wrapped correlation id + simple-wrapped range start +
/// simple-wrapped range end. Ranges are 1-based and inclusive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub kind: RelationKind,
    pub identifier: String,
    pub correlation_id: String,
    pub range_start: u32,
    pub range_end: u32,
}

impl Request {
    /// Parses a raw request frame.
    ///
    /// Characters after the range end field are ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] naming the first field that could not be
    /// read.
    pub fn parse(frame: &str) -> Result<Self, ParseError> {
        let kind_char = frame.chars().next().ok_or(ParseError::Empty)?;
        let kind =
            RelationKind::from_digit(kind_char).ok_or(ParseError::UnknownKind { kind: kind_char })?;

        let mut reader = FrameReader::new(frame);
        reader.take(kind_char.len_utf8(), Field::Kind)?;
        let encoded = reader.read_length_wrapped(Field::Identifier)?;
        let correlation_id = reader.read_simple_wrapped(Field::CorrelationId)?;
        let range_start = reader.read_simple_number(Field::RangeStart)?;
        let range_end = reader.read_simple_number(Field::RangeEnd)?;

        Ok(Self {
            kind,
            identifier: decode_identifier(encoded),
            correlation_id: correlation_id.to_owned(),
            range_start,
            range_end,
        })
    }

    /// Builds the frame that [`Request::parse`] reads.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::PayloadTooLong`] if the correlation id is longer
    /// than nine characters or a range bound has more than nine digits.
    pub fn to_frame(&self) -> Result<String, EncodeError> {
        let mut frame = String::new();
        frame.push(self.kind.to_digit());
        frame.push_str(&length_wrap(&encode_identifier(&self.identifier)));
        frame.push_str(&simple_wrap(&self.correlation_id)?);
        frame.push_str(&simple_wrap(&self.range_start.to_string())?);
        frame.push_str(&simple_wrap(&self.range_end.to_string())?);
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(kind: RelationKind) -> Request {
        Request {
            kind,
            identifier: "griffpatch".to_owned(),
            correlation_id: "4821".to_owned(),
            range_start: 1,
            range_end: 120,
        }
    }

    #[test]
    fn parses_the_documented_layout() {
        // kind 2, "ab" -> "1011" wrapped as "14"+"1011", id "77", range 1..40
        let parsed = Request::parse("214101127711240").unwrap();
        assert_eq!(
            parsed,
            Request {
                kind: RelationKind::Reverse,
                identifier: "ab".to_owned(),
                correlation_id: "77".to_owned(),
                range_start: 1,
                range_end: 40,
            }
        );
    }

    #[test]
    fn frames_round_trip_for_every_kind() {
        for kind in [
            RelationKind::Forward,
            RelationKind::Reverse,
            RelationKind::Mutual,
            RelationKind::ForwardOnly,
            RelationKind::ReverseOnly,
        ] {
            let req = request(kind);
            let frame = req.to_frame().unwrap();
            assert_eq!(Request::parse(&frame).unwrap(), req);
        }
    }

    #[test]
    fn trailing_characters_are_ignored() {
        let frame = format!("{}999", request(RelationKind::Mutual).to_frame().unwrap());
        assert_eq!(
            Request::parse(&frame).unwrap(),
            request(RelationKind::Mutual)
        );
    }

    #[test]
    fn rejects_empty_and_unknown_kinds() {
        assert_eq!(Request::parse(""), Err(ParseError::Empty));
        assert_eq!(
            Request::parse("6141011277112240"),
            Err(ParseError::UnknownKind { kind: '6' })
        );
        assert_eq!(
            Request::parse("☁"),
            Err(ParseError::UnknownKind { kind: '☁' })
        );
    }

    #[test]
    fn rejects_a_frame_cut_short() {
        let frame = request(RelationKind::Forward).to_frame().unwrap();
        let cut = &frame[..frame.len() - 2];
        assert!(matches!(
            Request::parse(cut),
            Err(ParseError::Truncated {
                field: Field::RangeEnd,
                ..
            })
        ));
    }

    #[test]
    fn rejects_non_numeric_range_fields() {
        assert!(matches!(
            Request::parse("21410112771a240"),
            Err(ParseError::InvalidDigit {
                field: Field::RangeStart,
                ..
            })
        ));
    }

    #[test]
    fn long_correlation_ids_cannot_be_framed() {
        let mut req = request(RelationKind::Forward);
        req.correlation_id = "1234567890".to_owned();
        assert_eq!(
            req.to_frame(),
            Err(EncodeError::PayloadTooLong { len: 10 })
        );
    }
}
