//! Best-effort outbound notifications on operation outcomes.
//!
//! Provider and credentials are read from settings on every send, so a
//! configuration change takes effect without a restart. Delivery is
//! fire-and-forget: transport errors are logged and swallowed.

use crate::db::connection::DbPool;
use crate::models::settings;
use rusqlite::Connection;
use std::time::Duration;

pub const KEY_PROVIDER: &str = "notify_provider";
pub const KEY_TOKEN: &str = "notify_token";
pub const KEY_CHAT_ID: &str = "notify_chat_id";
pub const KEY_URL: &str = "notify_url";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    None,
    Telegram,
    Webhook,
}

impl Provider {
    pub fn parse(s: &str) -> Self {
        match s {
            "telegram" => Provider::Telegram,
            "webhook" => Provider::Webhook,
            _ => Provider::None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub provider: Provider,
    pub token: String,
    pub chat_id: String,
    pub url: String,
}

pub fn load_config(conn: &Connection) -> anyhow::Result<NotifyConfig> {
    Ok(NotifyConfig {
        provider: Provider::parse(&settings::get_or(conn, KEY_PROVIDER, "none")?),
        token: settings::get_or(conn, KEY_TOKEN, "")?,
        chat_id: settings::get_or(conn, KEY_CHAT_ID, "")?,
        url: settings::get_or(conn, KEY_URL, "")?,
    })
}

pub struct Notifier {
    http: reqwest::Client,
}

impl Notifier {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");
        Self { http }
    }

    /// Sends one notification through the configured provider. Returns
    /// whether delivery succeeded at the HTTP level; failure is never an
    /// error for the caller.
    pub async fn send(&self, db: &DbPool, message: &str, is_success: bool) -> bool {
        let db = db.clone();
        let cfg = match tokio::task::spawn_blocking(move || {
            let conn = db.get()?;
            load_config(&conn)
        })
        .await
        {
            Ok(Ok(cfg)) => cfg,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Failed to load notification config");
                return false;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Notification config task failed");
                return false;
            }
        };

        let prefix = if is_success { "Palisade: " } else { "Palisade Error: " };
        let full_msg = format!("{prefix}{message}");

        let result = match cfg.provider {
            Provider::None => return false,
            Provider::Telegram => {
                if cfg.token.is_empty() || cfg.chat_id.is_empty() {
                    tracing::warn!("Telegram notification skipped: token or chat id missing");
                    return false;
                }
                let url = format!("https://api.telegram.org/bot{}/sendMessage", cfg.token);
                self.http
                    .post(url)
                    .form(&[("chat_id", cfg.chat_id.as_str()), ("text", full_msg.as_str())])
                    .send()
                    .await
            }
            Provider::Webhook => {
                if cfg.url.is_empty() {
                    tracing::warn!("Webhook notification skipped: url missing");
                    return false;
                }
                self.http
                    .post(&cfg.url)
                    .json(&serde_json::json!({
                        "content": full_msg,
                        "message": full_msg,
                        "priority": 5,
                    }))
                    .send()
                    .await
            }
        };

        match result {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), "Notification endpoint rejected message");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Notification delivery failed");
                false
            }
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::create_pool;
    use crate::db::migrate::migrate;
    use tempfile::TempDir;

    #[test]
    fn test_provider_parse() {
        assert_eq!(Provider::parse("telegram"), Provider::Telegram);
        assert_eq!(Provider::parse("webhook"), Provider::Webhook);
        assert_eq!(Provider::parse("none"), Provider::None);
        assert_eq!(Provider::parse("smoke-signal"), Provider::None);
    }

    #[test]
    fn test_load_config_defaults() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let pool = create_pool(&dir.path().join("test.db"));
        migrate(&pool, dir.path())?;
        let conn = pool.get()?;

        let cfg = load_config(&conn)?;
        assert_eq!(cfg.provider, Provider::None);
        assert!(cfg.token.is_empty());

        settings::set(&conn, KEY_PROVIDER, "webhook")?;
        settings::set(&conn, KEY_URL, "https://hooks.local/notify")?;
        let cfg = load_config(&conn)?;
        assert_eq!(cfg.provider, Provider::Webhook);
        assert_eq!(cfg.url, "https://hooks.local/notify");
        Ok(())
    }
}
