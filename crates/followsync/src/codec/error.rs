/// The frame field being read when a [`ParseError`] was raised.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Kind,
    Identifier,
    CorrelationId,
    RangeStart,
    RangeEnd,
}

impl core::fmt::Display for Field {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Kind => "kind",
            Self::Identifier => "identifier",
            Self::CorrelationId => "correlation id",
            Self::RangeStart => "range start",
            Self::RangeEnd => "range end",
        };
        f.write_str(name)
    }
}

/// Reasons an inbound request frame is rejected.
///
/// Every variant means the same thing to the caller: ignore the message and
/// emit no response. The variants exist so the branch is explicit and
/// testable.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty frame")]
    Empty,

    #[error("unknown request kind {kind:?}")]
    UnknownKind { kind: char },

    #[error("{field} truncated at index {index}: needed {needed} more characters")]
    Truncated {
        field: Field,
        index: usize,
        needed: usize,
    },

    #[error("{field} has a non-digit character at index {index}")]
    InvalidDigit { field: Field, index: usize },

    #[error("{field} is empty")]
    EmptyNumber { field: Field },
}

/// Errors produced while building frames.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// A simple-wrapped payload must fit a single length digit.
    #[error("payload of {len} characters does not fit a single length digit")]
    PayloadTooLong { len: usize },
}
