//! Paced delivery of chunked messages
//!
//! A [`Dispatcher`] splits outbound text, converts each chunk to chat HTML and
//! hands the chunks to a [`ChatTransport`] strictly in order, pausing between
//! consecutive chunks. [`StreamingDispatcher`] does the same for text that
//! arrives in fragments, flushing whenever its buffer grows large enough.
//!
//! Transport failures abort the dispatch and propagate; retrying is the
//! transport's business.

use crate::config::DispatchConfig;
use crate::error::{DispatchError, TransportError};
use crate::messaging::chunker::ChunkingPolicy;
use crate::messaging::markup::markdown_to_html;
use serde::Serialize;
use std::io::Write;
use std::thread;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outbound side of a chat platform
pub trait ChatTransport {
    /// Show a "typing…" indicator in the chat
    fn send_typing(&mut self, chat_id: &str) -> Result<(), TransportError>;

    /// Deliver one HTML-formatted message
    fn send_html(&mut self, chat_id: &str, html: &str) -> Result<(), TransportError>;
}

impl<T: ChatTransport + ?Sized> ChatTransport for &mut T {
    fn send_typing(&mut self, chat_id: &str) -> Result<(), TransportError> {
        (**self).send_typing(chat_id)
    }

    fn send_html(&mut self, chat_id: &str, html: &str) -> Result<(), TransportError> {
        (**self).send_html(chat_id, html)
    }
}

/// Summary of one completed dispatch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchReport {
    pub dispatch_id: Uuid,
    pub chunks_sent: usize,
}

/// Sequential, paced sender for one transport
pub struct Dispatcher<T: ChatTransport> {
    transport: T,
    config: DispatchConfig,
    policy: ChunkingPolicy,
}

impl<T: ChatTransport> Dispatcher<T> {
    pub fn new(transport: T, config: DispatchConfig) -> Self {
        let policy = ChunkingPolicy::new(config.max_message_length);
        Self {
            transport,
            config,
            policy,
        }
    }

    /// Dispatcher with default limits and pacing
    pub fn with_defaults(transport: T) -> Self {
        Self::new(transport, DispatchConfig::default())
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Split, convert and send `message` to `chat_id`
    pub fn send(&mut self, chat_id: &str, message: &str) -> Result<DispatchReport, DispatchError> {
        let dispatch_id = Uuid::new_v4();
        let chunks = self.policy.split(message);
        info!(%dispatch_id, chat_id, chunks = chunks.len(), "dispatching message");

        let chunks_sent = self.send_chunks(dispatch_id, chat_id, &chunks)?;
        Ok(DispatchReport {
            dispatch_id,
            chunks_sent,
        })
    }

    /// Start a streaming dispatch to `chat_id`
    pub fn stream(&mut self, chat_id: &str) -> StreamingDispatcher<'_, T> {
        StreamingDispatcher {
            dispatch_id: Uuid::new_v4(),
            chat_id: chat_id.to_string(),
            buffer: String::new(),
            buffered_chars: 0,
            fragments: 0,
            chunks_sent: 0,
            dispatcher: self,
        }
    }

    fn send_chunks(
        &mut self,
        dispatch_id: Uuid,
        chat_id: &str,
        chunks: &[String],
    ) -> Result<usize, DispatchError> {
        let total_chunks = chunks.len();
        let delay = self.config.inter_chunk_delay();

        for (index, chunk) in chunks.iter().enumerate() {
            if self.config.typing_indicator {
                self.transport
                    .send_typing(chat_id)
                    .map_err(DispatchError::Typing)?;
            }

            let html = markdown_to_html(chunk);
            if let Err(source) = self.transport.send_html(chat_id, &html) {
                warn!(%dispatch_id, chat_id, chunk = index + 1, error = %source, "chunk delivery failed");
                return Err(DispatchError::Transport {
                    chunk_index: index + 1,
                    total_chunks,
                    source,
                });
            }
            debug!(%dispatch_id, chunk = index + 1, total_chunks, chars = chunk.chars().count(), "chunk sent");

            if index + 1 < total_chunks && !delay.is_zero() {
                thread::sleep(delay);
            }
        }

        Ok(total_chunks)
    }
}

/// Buffers streamed text fragments and flushes them through a [`Dispatcher`]
pub struct StreamingDispatcher<'a, T: ChatTransport> {
    dispatcher: &'a mut Dispatcher<T>,
    dispatch_id: Uuid,
    chat_id: String,
    buffer: String,
    buffered_chars: usize,
    fragments: usize,
    chunks_sent: usize,
}

impl<'a, T: ChatTransport> StreamingDispatcher<'a, T> {
    /// Append a fragment, flushing once the size or fragment threshold is reached
    pub fn push(&mut self, fragment: &str) -> Result<(), DispatchError> {
        if fragment.is_empty() {
            return Ok(());
        }
        self.buffer.push_str(fragment);
        self.buffered_chars += fragment.chars().count();
        self.fragments += 1;

        let config = &self.dispatcher.config;
        if self.buffered_chars >= config.stream_flush_chars
            || self.fragments >= config.stream_flush_fragments
        {
            self.flush()?;
        }
        Ok(())
    }

    /// Send whatever is buffered right now
    pub fn flush(&mut self) -> Result<(), DispatchError> {
        let text = std::mem::take(&mut self.buffer);
        self.buffered_chars = 0;
        self.fragments = 0;

        let chunks = self.dispatcher.policy.split(&text);
        if chunks.is_empty() {
            return Ok(());
        }
        debug!(dispatch_id = %self.dispatch_id, chunks = chunks.len(), "flushing stream buffer");
        self.chunks_sent += self
            .dispatcher
            .send_chunks(self.dispatch_id, &self.chat_id, &chunks)?;
        Ok(())
    }

    /// Flush the remainder and report
    pub fn finish(mut self) -> Result<DispatchReport, DispatchError> {
        self.flush()?;
        info!(dispatch_id = %self.dispatch_id, chat_id = %self.chat_id, chunks = self.chunks_sent, "stream complete");
        Ok(DispatchReport {
            dispatch_id: self.dispatch_id,
            chunks_sent: self.chunks_sent,
        })
    }

    /// Characters waiting in the buffer
    pub fn buffered_chars(&self) -> usize {
        self.buffered_chars
    }
}

/// Transport that writes every action as one NDJSON line (dry runs, piping)
pub struct WriterTransport<W: Write> {
    writer: W,
}

#[derive(Serialize)]
struct TransportRecord<'a> {
    chat_id: &'a str,
    action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<&'a str>,
}

impl<W: Write> WriterTransport<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_record(&mut self, record: &TransportRecord<'_>) -> Result<(), TransportError> {
        let line = serde_json::to_string(record)
            .map_err(|e| TransportError::Rejected(e.to_string()))?;
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> ChatTransport for WriterTransport<W> {
    fn send_typing(&mut self, chat_id: &str) -> Result<(), TransportError> {
        self.write_record(&TransportRecord {
            chat_id,
            action: "typing",
            html: None,
        })
    }

    fn send_html(&mut self, chat_id: &str, html: &str) -> Result<(), TransportError> {
        self.write_record(&TransportRecord {
            chat_id,
            action: "message",
            html: Some(html),
        })
    }
}
