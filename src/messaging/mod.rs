//! Outbound chat messaging
//!
//! Long replies are split into platform-sized chunks, converted to the chat
//! HTML subset and delivered in order with a pause between chunks.
//!
//! Pipeline: text → chunker → markup → dispatch → transport

pub mod chunker;
pub mod dispatch;
pub mod markup;

pub use chunker::{split, split_default, ChunkingPolicy, SplitStrategy};
pub use dispatch::{ChatTransport, DispatchReport, Dispatcher, StreamingDispatcher, WriterTransport};
pub use markup::markdown_to_html;
