//! The realtime cloud channel.
//!
//! [`ChannelClient`] drives a connection through
//! `Connecting -> Connected -> Reconnecting -> Connecting ...` until it is
//! stopped, at which point it settles in `Disconnected`. While connected it
//! sends the handshake, a periodic heartbeat and a liveness value, and feeds
//! writes to the request slot through the [`Dispatcher`](crate::Dispatcher).
//!
//! The transport itself sits behind [`Connector`], which yields a
//! [`FrameSink`] and [`FrameStream`] pair per connection.

mod client;
mod message;
mod transport;

pub use client::*;
pub use message::*;
pub use transport::*;
