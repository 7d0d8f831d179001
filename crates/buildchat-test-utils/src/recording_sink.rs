// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message sink that records deliveries and fails on demand.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::Mutex;

use buildchat_core::{BuildchatError, MessageSink, MessageTarget};

/// Records every delivered message. Deliveries to targets registered with
/// [`fail_for`](Self::fail_for) fail with a transport error.
#[derive(Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<(MessageTarget, String)>>,
    attempted: Mutex<Vec<MessageTarget>>,
    failing: HashSet<String>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(mut self, address: &str) -> Self {
        self.failing.insert(address.to_lowercase());
        self
    }

    /// Successful deliveries, in order.
    pub async fn delivered(&self) -> Vec<(MessageTarget, String)> {
        self.delivered.lock().await.clone()
    }

    /// Every target a delivery was attempted for, failed ones included.
    pub async fn attempted(&self) -> Vec<MessageTarget> {
        self.attempted.lock().await.clone()
    }

    pub async fn texts_for(&self, address: &str) -> Vec<String> {
        let address = address.to_lowercase();
        self.delivered
            .lock()
            .await
            .iter()
            .filter(|(t, _)| t.normalized() == address)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn send(&self, target: &MessageTarget, text: &str) -> Result<(), BuildchatError> {
        self.attempted.lock().await.push(target.clone());
        if self.failing.contains(&target.normalized()) {
            return Err(BuildchatError::transport(format!(
                "delivery to `{target}` failed"
            )));
        }
        self.delivered
            .lock()
            .await
            .push((target.clone(), text.to_string()));
        Ok(())
    }
}
