use std::env;
use std::str::FromStr;

use tracing::warn;

/// Which persistence contract implementation backs the cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Supabase,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "memory" | "in_memory" | "in-memory" => Ok(StoreBackend::Memory),
            "supabase" | "rest" => Ok(StoreBackend::Supabase),
            other => Err(format!("unknown store backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub store_backend: StoreBackend,
    pub meeting_base_url: String,
    pub meeting_link_secret: String,
    pub notification_webhook_url: Option<String>,
    pub notification_from: String,
    pub notification_workers: usize,
    pub notification_queue_capacity: usize,
    pub notification_timeout_seconds: u64,
    pub server_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let supabase_url = env::var("SUPABASE_URL")
            .unwrap_or_else(|_| {
                warn!("SUPABASE_URL not set, using empty value");
                String::new()
            });
        let supabase_anon_key = env::var("SUPABASE_ANON_PUBLIC_KEY")
            .unwrap_or_else(|_| {
                warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                String::new()
            });
        let supabase_jwt_secret = env::var("SUPABASE_JWT_SECRET")
            .unwrap_or_else(|_| {
                warn!("SUPABASE_JWT_SECRET not set, using empty value");
                String::new()
            });

        let supabase_ready = !supabase_url.is_empty() && !supabase_anon_key.is_empty();
        let store_backend = match env::var("MEDIBOT_STORE") {
            Ok(raw) => raw.parse().unwrap_or_else(|e: String| {
                warn!("{}, falling back to in-memory store", e);
                StoreBackend::Memory
            }),
            Err(_) if supabase_ready => StoreBackend::Supabase,
            Err(_) => {
                warn!("MEDIBOT_STORE not set and Supabase not configured, using in-memory store");
                StoreBackend::Memory
            }
        };

        let meeting_link_secret = env::var("MEDIBOT_MEETING_SECRET")
            .unwrap_or_else(|_| {
                warn!("MEDIBOT_MEETING_SECRET not set, deriving meeting links from the JWT secret");
                supabase_jwt_secret.clone()
            });

        let config = Self {
            supabase_url,
            supabase_anon_key,
            supabase_jwt_secret,
            store_backend,
            meeting_base_url: env::var("MEDIBOT_MEETING_BASE_URL")
                .unwrap_or_else(|_| {
                    warn!("MEDIBOT_MEETING_BASE_URL not set, using default");
                    "https://medibot-meet.com".to_string()
                }),
            meeting_link_secret,
            notification_webhook_url: env::var("NOTIFICATION_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.is_empty()),
            notification_from: env::var("NOTIFICATION_FROM")
                .unwrap_or_else(|_| "noreply@medibot.com".to_string()),
            notification_workers: parse_or("NOTIFICATION_WORKERS", 2),
            notification_queue_capacity: parse_or("NOTIFICATION_QUEUE_CAPACITY", 256),
            notification_timeout_seconds: parse_or("NOTIFICATION_TIMEOUT_SECONDS", 10),
            server_port: parse_or("PORT", 3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }
        if config.notification_webhook_url.is_none() {
            warn!("NOTIFICATION_WEBHOOK_URL not set, notifications will only be logged");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_jwt_secret.is_empty()
            && (self.store_backend == StoreBackend::Memory || self.is_supabase_configured())
    }

    pub fn is_supabase_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value ({}), using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_backend_parsing() {
        assert_eq!("memory".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
        assert_eq!(" Supabase ".parse::<StoreBackend>(), Ok(StoreBackend::Supabase));
        assert!("postgres".parse::<StoreBackend>().is_err());
    }
}
