//! Per-dispatch context handed to plugins and handlers.
//!
//! The transport builds one [`Context`] per inbound request. It carries the
//! correlation id, the resolved message id and the cancellation signals. The
//! pipeline never imposes a timeout itself; handlers that do long work should
//! poll [`Context::is_cancelled`].

use crate::ids::RequestId;
use crate::message::MessageId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Clone, Default, Debug)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation to every holder of this token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Request-scoped data for one dispatch.
#[derive(Clone, Debug)]
pub struct Context {
    request_id: RequestId,
    message_id: MessageId,
    cancel: CancelToken,
    deadline: Option<Instant>,
    received_at: Instant,
}

impl Context {
    /// Fresh context with a new request id and no deadline.
    #[must_use]
    pub fn new(message_id: impl Into<MessageId>) -> Self {
        Context {
            request_id: RequestId::new(),
            message_id: message_id.into(),
            cancel: CancelToken::new(),
            deadline: None,
            received_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    /// Share a cancellation token owned by the transport.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline relative to when the context was created.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let deadline = self.received_at + timeout;
        self.with_deadline(deadline)
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    #[must_use]
    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    #[must_use]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time since the transport created this context
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.received_at.elapsed()
    }

    /// `true` once the token fired or the deadline passed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}
