//! In-memory backend that records payloads and replays canned replies.

use std::collections::VecDeque;

use async_trait::async_trait;

use super::{BackendError, BackendKind, ChatBackend};
use crate::prompt::PromptPayload;

pub(crate) struct FakeBackend {
    kind: BackendKind,
    replies: VecDeque<String>,
    fail: bool,
    pub payloads: Vec<PromptPayload>,
}

impl FakeBackend {
    pub fn replying<const N: usize>(kind: BackendKind, replies: [&str; N]) -> Self {
        Self {
            kind,
            replies: replies.iter().map(|r| r.to_string()).collect(),
            fail: false,
            payloads: Vec::new(),
        }
    }

    pub fn failing(kind: BackendKind) -> Self {
        Self {
            kind,
            replies: VecDeque::new(),
            fail: true,
            payloads: Vec::new(),
        }
    }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn send(&mut self, payload: PromptPayload) -> Result<String, BackendError> {
        self.payloads.push(payload);
        if self.fail {
            return Err(BackendError::Api {
                status: 429,
                message: "rate limited".to_string(),
            });
        }
        self.replies.pop_front().ok_or(BackendError::EmptyResponse)
    }
}
