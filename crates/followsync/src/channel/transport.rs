use crate::TransportError;
use core::pin::Pin;
use futures::{Sink, Stream};

/// A transport-level frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    /// Keep-alive probe; answered with a [`Frame::Pong`] carrying the same
    /// payload.
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close,
}

/// Outbound half of an open channel.
pub type FrameSink = Pin<Box<dyn Sink<Frame, Error = TransportError> + Send>>;

/// Inbound half of an open channel. The stream ending means the peer is gone.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, TransportError>> + Send>>;

/// Opens duplex channels to the cloud server.
///
/// Each call yields a fresh connection. The client wraps every call in its
/// own connect timeout and drops the future when it fires, so
/// implementations need no timeout of their own.
pub trait Connector: Send + Sync + 'static {
    fn connect(
        &self,
    ) -> impl Future<Output = Result<(FrameSink, FrameStream), TransportError>> + Send;
}

impl<C: Connector> Connector for std::sync::Arc<C> {
    fn connect(
        &self,
    ) -> impl Future<Output = Result<(FrameSink, FrameStream), TransportError>> + Send {
        (**self).connect()
    }
}
