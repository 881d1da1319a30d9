use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;

type HmacSha256 = Hmac<Sha256>;

/// Mints video-room references. No room is provisioned here; the link is a
/// stable, unguessable name for one.
#[derive(Debug, Clone)]
pub struct MeetingLinkMinter {
    base_url: String,
    secret: String,
}

impl MeetingLinkMinter {
    pub fn new(base_url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret: secret.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.meeting_base_url.clone(), config.meeting_link_secret.clone())
    }

    /// Link stored on a pending appointment until the doctor approves it.
    pub fn placeholder(&self, appointment_id: Uuid) -> String {
        format!("{}/lobby/{}", self.base_url, appointment_id)
    }

    /// Same appointment and secret always give the same room.
    pub fn mint(&self, appointment_id: Uuid) -> String {
        // HMAC accepts keys of any length, including empty ones.
        let mut mac = match HmacSha256::new_from_slice(self.secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return format!("{}/room/{}", self.base_url, appointment_id.simple()),
        };
        mac.update(appointment_id.as_bytes());
        let token = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{}/room/{}", self.base_url, token)
    }
}
