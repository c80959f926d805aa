//! Digit-string codec for cloud-variable payloads.
//!
//! Cloud variables only carry numbers, so everything crossing the channel is
//! a decimal digit string:
//!
//! - usernames become two digits per character ([`encode_identifier`]),
//! - variable-length fields are self-describing through [`length_wrap`],
//! - short fields (correlation ids, range bounds) use [`simple_wrap`].
//!
//! Request frames are parsed with [`Request::parse`], which walks the fields
//! through a [`FrameReader`] and reports the first unreadable one as a
//! [`ParseError`].

mod alphabet;
mod error;
mod frame;
mod request;

pub use alphabet::*;
pub use error::*;
pub use frame::*;
pub use request::*;
