//! Splitting replies into platform-sized messages and sending them in order.

use {
    parlor_channels::{ChannelOutbound, SentMessage},
    tracing::{debug, warn},
};

/// Telegram's message length limit.
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 4096;

/// One message of a multi-part reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundChunk {
    pub text: String,
    /// Platform message ID to reply to. Only the first chunk has one.
    pub reply_to: Option<String>,
}

/// Split `text` into segments of at most `max_len` characters, on line
/// boundaries.
///
/// Lines are appended greedily while the segment plus the line and its
/// newline still fits. A single line longer than `max_len` becomes its own
/// oversized segment.
#[must_use]
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for line in text.split('\n') {
        let line_len = line.chars().count();
        if current_len + line_len + 1 <= max_len {
            if !current.is_empty() {
                current.push('\n');
                current_len += 1;
            }
            current.push_str(line);
            current_len += line_len;
        } else {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            current.push_str(line);
            current_len = line_len;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Split `text` and attach the reply target to the first segment.
#[must_use]
pub fn chunk(text: &str, max_len: usize, reply_to: Option<&str>) -> Vec<OutboundChunk> {
    split_message(text, max_len)
        .into_iter()
        .enumerate()
        .map(|(i, text)| OutboundChunk {
            text,
            reply_to: if i == 0 {
                reply_to.map(str::to_string)
            } else {
                None
            },
        })
        .collect()
}

/// Result of sending a sequence of chunks.
#[derive(Debug, Default)]
pub struct Delivery {
    /// Messages the platform accepted, in send order.
    pub sent: Vec<SentMessage>,
    /// Number of chunks that were planned.
    pub planned: usize,
    pub error: Option<parlor_channels::Error>,
}

impl Delivery {
    /// Whether every planned chunk was sent.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.sent.len() == self.planned
    }
}

/// Send chunks one after another. The first failure stops delivery; the
/// chunks sent before it are still returned.
pub async fn deliver(
    outbound: &dyn ChannelOutbound,
    chat_id: &str,
    chunks: &[OutboundChunk],
) -> Delivery {
    let mut delivery = Delivery {
        planned: chunks.len(),
        ..Default::default()
    };
    for (i, chunk) in chunks.iter().enumerate() {
        match outbound
            .send_text(chat_id, &chunk.text, chunk.reply_to.as_deref())
            .await
        {
            Ok(sent) => {
                debug!(chat_id, chunk = i, message_id = %sent.message_id, "chunk sent");
                delivery.sent.push(sent);
            },
            Err(e) => {
                warn!(
                    chat_id,
                    chunk = i,
                    remaining = chunks.len() - i,
                    error = %e,
                    "send failed, dropping remaining chunks"
                );
                delivery.error = Some(e);
                break;
            },
        }
    }
    delivery
}
