//! In-memory mailer for tests.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{ConfirmationMessage, Mailer};
use crate::error::MailError;

#[derive(Debug, Default)]
struct State {
    sent: Vec<ConfirmationMessage>,
    attempts: usize,
    fail_next: usize,
    fail_always: bool,
}

/// Records delivered messages and can be told to fail.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMailer {
    state: Arc<Mutex<State>>,
}

impl InMemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every send fail until turned off.
    pub async fn set_fail_on_send(&self, fail: bool) {
        self.state.lock().await.fail_always = fail;
    }

    /// Makes the next `count` sends fail.
    pub async fn fail_next(&self, count: usize) {
        self.state.lock().await.fail_next = count;
    }

    /// Returns every successfully delivered message.
    pub async fn sent(&self) -> Vec<ConfirmationMessage> {
        self.state.lock().await.sent.clone()
    }

    /// Returns how many sends were attempted, failed or not.
    pub async fn attempts(&self) -> usize {
        self.state.lock().await.attempts
    }
}

#[async_trait]
impl Mailer for InMemoryMailer {
    async fn send(&self, message: &ConfirmationMessage) -> Result<(), MailError> {
        let mut state = self.state.lock().await;
        state.attempts += 1;
        message.to.parse::<lettre::Address>()?;

        if state.fail_always {
            return Err(MailError::Rejected("mail server unavailable".to_string()));
        }
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(MailError::Rejected("mail server unavailable".to_string()));
        }

        state.sent.push(message.clone());
        Ok(())
    }
}
