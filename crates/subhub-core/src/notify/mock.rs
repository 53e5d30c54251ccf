//! Mock transport for testing

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::NotificationTransport;
use crate::error::{Error, Result};

/// A message captured by [`MockTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Records every message instead of sending it
///
/// Clones share the same record, so a copy handed to a dispatcher can be
/// inspected afterwards. Recipients registered with [`MockTransport::fail_for`]
/// get a send error.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    sent: Arc<Mutex<Vec<SentMessage>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sends to `recipient` fail
    pub fn fail_for(&self, recipient: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(recipient.to_lowercase());
        }
    }

    /// Messages recorded so far, in send order
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[async_trait]
impl NotificationTransport for MockTransport {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let should_fail = self
            .failing
            .lock()
            .map(|f| f.contains(&recipient.to_lowercase()))
            .unwrap_or(false);
        if should_fail {
            return Err(Error::Notification(format!(
                "mock delivery to {} failed",
                recipient
            )));
        }

        let mut sent = self
            .sent
            .lock()
            .map_err(|_| Error::Notification("mock transport lock poisoned".to_string()))?;
        sent.push(SentMessage {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });

        tracing::info!(to = %recipient, subject = %subject, "[MOCK] Reminder recorded");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
