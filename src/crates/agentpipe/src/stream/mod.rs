//! Parsing of an agent's line-delimited JSON event stream.

mod decoder;
mod event;

pub use decoder::{decode, StreamDecoder, MAX_LINE_BYTES};
pub use event::{ContentBlock, Message, StreamEvent};
