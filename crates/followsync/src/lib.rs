mod cache;
mod channel;
mod chunker;
mod codec;
mod dispatcher;
mod error;
mod resolver;
mod responder;
mod time;

pub use crate::cache::*;
pub use crate::channel::*;
pub use crate::chunker::*;
pub use crate::codec::*;
pub use crate::dispatcher::*;
pub use crate::error::*;
pub use crate::resolver::*;
pub use crate::responder::*;
pub use crate::time::*;
