use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::models::{Notification, NotificationError};

/// Outbound delivery channel for rendered notifications.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotificationError>;

    fn name(&self) -> &'static str;
}

/// Writes each message to the log instead of sending it.
pub struct LogGateway {
    from: String,
}

impl LogGateway {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl NotificationGateway for LogGateway {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotificationError> {
        info!(
            kind = %notification.kind,
            appointment_id = %notification.appointment_id,
            "Email from {} to {}: {}",
            self.from,
            notification.recipient,
            notification.subject
        );
        debug!("Email body:\n{}", notification.body);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// POSTs each message as JSON to an email relay.
pub struct WebhookGateway {
    client: Client,
    url: String,
    from: String,
}

impl WebhookGateway {
    pub fn new(url: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            from: from.into(),
        }
    }
}

#[async_trait]
impl NotificationGateway for WebhookGateway {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotificationError> {
        let payload = json!({
            "type": notification.kind,
            "to": notification.recipient,
            "from": self.from,
            "subject": notification.subject,
            "body": notification.body,
            "appointment_id": notification.appointment_id,
        });

        debug!("Posting {} notification to {}", notification.kind, self.url);

        let response = self.client.post(&self.url).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(NotificationError::Delivery(format!(
                "webhook returned {}: {}",
                status, error_text
            )));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}

/// Keeps delivered messages in memory so tests can inspect what was sent.
#[derive(Default)]
pub struct MemoryGateway {
    delivered: Mutex<Vec<Notification>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn delivered(&self) -> Vec<Notification> {
        self.delivered.lock().await.clone()
    }
}

#[async_trait]
impl NotificationGateway for MemoryGateway {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotificationError> {
        self.delivered.lock().await.push(notification.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
