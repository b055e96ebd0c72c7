//! Application endpoints
//!
//! [`MessageSource`] produces numbered messages at a fixed interval and holds
//! on to a refused message until the sender takes it. [`MessageSink`] records
//! what the receiver delivers.

use bytes::Bytes;
use sr_protocol::Application;

/// Payload for message number `n`
pub fn message_payload(n: u64) -> Bytes {
    Bytes::from(format!("msg-{}", n))
}

/// Producer side of the application
#[derive(Debug, Clone)]
pub struct MessageSource {
    total: u64,
    generated: u64,
    pending: Option<Bytes>,
}

impl MessageSource {
    /// Source that will produce `total` messages
    pub fn new(total: u64) -> Self {
        MessageSource {
            total,
            generated: 0,
            pending: None,
        }
    }

    /// Message waiting to be offered, generating the next one if needed
    pub fn next_message(&mut self) -> Option<Bytes> {
        if self.pending.is_none() && self.generated < self.total {
            self.pending = Some(message_payload(self.generated));
            self.generated += 1;
        }
        self.pending.clone()
    }

    /// Message waiting for window space, without generating
    pub fn pending(&self) -> Option<&Bytes> {
        self.pending.as_ref()
    }

    /// The sender accepted the pending message
    pub fn accepted(&mut self) {
        self.pending = None;
    }

    /// Messages generated so far
    pub fn generated(&self) -> u64 {
        self.generated
    }

    /// Messages this source will produce in total
    pub fn total(&self) -> u64 {
        self.total
    }

    /// True when every message was generated and handed over
    pub fn is_exhausted(&self) -> bool {
        self.generated >= self.total && self.pending.is_none()
    }
}

/// Consumer side of the application
#[derive(Debug, Clone, Default)]
pub struct MessageSink {
    received: Vec<Bytes>,
}

impl MessageSink {
    /// Empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Payloads in delivery order
    pub fn received(&self) -> &[Bytes] {
        &self.received
    }

    /// Number of payloads delivered
    pub fn len(&self) -> usize {
        self.received.len()
    }

    /// True when nothing was delivered
    pub fn is_empty(&self) -> bool {
        self.received.is_empty()
    }

    /// True when the sink holds exactly messages `0..count`, in order
    pub fn is_exact_sequence(&self, count: u64) -> bool {
        self.received.len() as u64 == count
            && self
                .received
                .iter()
                .zip(0..)
                .all(|(payload, n)| *payload == message_payload(n))
    }
}

impl Application for MessageSink {
    fn deliver(&mut self, payload: Bytes) {
        tracing::trace!(len = payload.len(), "application received payload");
        self.received.push(payload);
    }
}
