use std::env;
use tracing::warn;

/// Runtime configuration for the session core, loaded once at startup.
///
/// Every knob has a working default so a bare environment still boots; missing
/// collaborator endpoints are warned about and the corresponding client falls
/// back to its in-memory implementation.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_port: u16,

    // Session lifecycle
    pub imminent_window_minutes: i64,
    pub default_duration_minutes: i64,

    // Presence gateway
    pub heartbeat_interval_seconds: u64,
    pub presence_grace_seconds: u64,

    // Meeting-link generation
    pub link_timeout_seconds: u64,
    pub link_max_attempts: u32,
    pub link_retry_backoff_ms: u64,

    // Reminder dispatcher
    pub reminder_poll_seconds: u64,

    // External collaborators
    pub appointment_api_url: String,
    pub appointment_api_key: String,
    pub room_service_url: String,
    pub room_service_token: String,
    pub chat_api_url: String,
    pub notify_api_url: String,
    pub notify_api_key: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            bind_port: env_parse("BIND_PORT", 3000),

            imminent_window_minutes: env_parse("IMMINENT_WINDOW_MINUTES", 10),
            default_duration_minutes: env_parse("DEFAULT_DURATION_MINUTES", 30),

            heartbeat_interval_seconds: env_parse("HEARTBEAT_INTERVAL_SECONDS", 30),
            presence_grace_seconds: env_parse("PRESENCE_GRACE_SECONDS", 30),

            link_timeout_seconds: env_parse("LINK_TIMEOUT_SECONDS", 15),
            link_max_attempts: env_parse("LINK_MAX_ATTEMPTS", 3),
            link_retry_backoff_ms: env_parse("LINK_RETRY_BACKOFF_MS", 500),

            reminder_poll_seconds: env_parse("REMINDER_POLL_SECONDS", 60),

            appointment_api_url: env_or_empty("APPOINTMENT_API_URL"),
            appointment_api_key: env_or_empty("APPOINTMENT_API_KEY"),
            room_service_url: env_or_empty("ROOM_SERVICE_URL"),
            room_service_token: env_or_empty("ROOM_SERVICE_TOKEN"),
            chat_api_url: env_or_empty("CHAT_API_URL"),
            notify_api_url: env_or_empty("NOTIFY_API_URL"),
            notify_api_key: env_or_empty("NOTIFY_API_KEY"),
        };

        if !config.is_room_service_configured() {
            warn!("Room service not configured - meeting links will use the in-process generator");
        }
        if !config.is_notifier_configured() {
            warn!("Notification service not configured - reminders will be recorded locally only");
        }

        config
    }

    pub fn is_appointment_api_configured(&self) -> bool {
        !self.appointment_api_url.is_empty() && !self.appointment_api_key.is_empty()
    }

    pub fn is_room_service_configured(&self) -> bool {
        !self.room_service_url.is_empty() && !self.room_service_token.is_empty()
    }

    pub fn is_chat_api_configured(&self) -> bool {
        !self.chat_api_url.is_empty()
    }

    pub fn is_notifier_configured(&self) -> bool {
        !self.notify_api_url.is_empty() && !self.notify_api_key.is_empty()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_port: 3000,
            imminent_window_minutes: 10,
            default_duration_minutes: 30,
            heartbeat_interval_seconds: 30,
            presence_grace_seconds: 30,
            link_timeout_seconds: 15,
            link_max_attempts: 3,
            link_retry_backoff_ms: 500,
            reminder_poll_seconds: 60,
            appointment_api_url: String::new(),
            appointment_api_key: String::new(),
            room_service_url: String::new(),
            room_service_token: String::new(),
            chat_api_url: String::new(),
            notify_api_url: String::new(),
            notify_api_key: String::new(),
        }
    }
}

fn env_or_empty(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| {
        warn!("{} not set, using empty value", name);
        String::new()
    })
}

fn env_parse<T: std::str::FromStr + std::fmt::Display>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_windows() {
        let config = AppConfig::default();
        assert_eq!(config.imminent_window_minutes, 10);
        assert_eq!(config.default_duration_minutes, 30);
        assert_eq!(config.heartbeat_interval_seconds, 30);
        assert_eq!(config.link_timeout_seconds, 15);
    }

    #[test]
    fn unconfigured_collaborators_are_reported() {
        let config = AppConfig::default();
        assert!(!config.is_room_service_configured());
        assert!(!config.is_notifier_configured());
        assert!(!config.is_appointment_api_configured());
    }
}
