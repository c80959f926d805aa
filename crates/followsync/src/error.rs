//! Error types for the relay's external collaborators.
//!
//! Neither error is ever surfaced to whoever sent a request: an
//! [`UpstreamError`] degrades to an empty page, and a [`TransportError`]
//! sends the channel client back through its reconnect cycle.
//!
//! ## Error Cases
//! - `UpstreamError::Status`: the listing service answered with a non-success
//!   status.
//! - `UpstreamError::Request`: the request could not be sent or its body could
//!   not be read.
//! - `UpstreamError::Decode`: the body was not the expected listing shape.
//! - `TransportError::Connect`: the duplex channel could not be opened.
//! - `TransportError::Closed`: the peer closed the channel.
//! - `TransportError::Io`: reading or writing an open channel failed.

/// Failure of a single page request against the listing service.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    #[error("listing service answered with status {status}")]
    Status { status: u16 },

    #[error("listing request failed: {context}")]
    Request { context: String },

    #[error("listing response could not be decoded: {context}")]
    Decode { context: String },
}

/// Failure of the duplex channel.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connect failed: {context}")]
    Connect { context: String },

    #[error("channel closed by peer")]
    Closed,

    #[error("channel i/o failed: {context}")]
    Io { context: String },
}
