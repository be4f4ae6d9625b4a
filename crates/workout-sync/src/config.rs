use anyhow::Context;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use workout_core::{RefreshCredentials, WorkoutZone, STRONG_LINK_PREFIX};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Re-run the sync this often (seconds); run once and exit when absent
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,

    /// Mailbox the workout emails arrive in
    pub imap: ImapConfig,

    /// Outgoing server for failure notifications
    pub smtp: SmtpConfig,

    /// Activity service OAuth client
    pub strava: StravaConfig,

    #[serde(default)]
    pub workout: WorkoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImapConfig {
    /// IMAP server hostname
    pub host: String,

    #[serde(default = "default_imap_port")]
    pub port: u16,

    pub username: String,

    /// Password or app password
    pub password: String,

    #[serde(default = "default_mailbox")]
    pub mailbox: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,

    /// STARTTLS port
    #[serde(default = "default_smtp_port")]
    pub port: u16,

    /// Display name on the From header
    pub sender_name: String,

    /// From address, also the SMTP login
    pub sender: String,

    /// Where notifications are delivered
    pub receiver: String,

    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StravaConfig {
    pub client_id: String,
    pub client_secret: String,

    /// Long-lived refresh token from the initial authorization
    pub refresh_token: String,

    #[serde(default = "default_grant_type")]
    pub grant_type: String,

    #[serde(default = "default_token_url")]
    pub token_url: String,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutConfig {
    /// Body substring that marks a workout email
    #[serde(default = "default_link_prefix")]
    pub link_prefix: String,

    /// IANA zone the email times are in; the host zone when unset
    #[serde(default)]
    pub timezone: Option<String>,
}

impl Default for WorkoutConfig {
    fn default() -> Self {
        Self {
            link_prefix: default_link_prefix(),
            timezone: None,
        }
    }
}

fn default_imap_port() -> u16 {
    993
}

fn default_mailbox() -> String {
    "INBOX".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_grant_type() -> String {
    "refresh_token".to_string()
}

fn default_token_url() -> String {
    "https://www.strava.com/oauth/token".to_string()
}

fn default_api_base_url() -> String {
    "https://www.strava.com/api/v3".to_string()
}

fn default_link_prefix() -> String {
    STRONG_LINK_PREFIX.to_string()
}

impl Config {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content).context("Invalid config file")?;
        // Surface a bad zone name at startup rather than on the first email
        config.workout_zone()?;
        Ok(config)
    }

    pub fn workout_zone(&self) -> anyhow::Result<WorkoutZone> {
        match &self.workout.timezone {
            None => Ok(WorkoutZone::Local),
            Some(name) => {
                let tz: Tz = name
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Invalid timezone: {}", name))?;
                Ok(WorkoutZone::Named(tz))
            }
        }
    }

    pub fn refresh_credentials(&self) -> RefreshCredentials {
        RefreshCredentials {
            client_id: self.strava.client_id.clone(),
            client_secret: self.strava.client_secret.clone(),
            refresh_token: self.strava.refresh_token.clone(),
            grant_type: self.strava.grant_type.clone(),
        }
    }

    pub fn example() -> Self {
        Config {
            poll_interval_secs: None,
            imap: ImapConfig {
                host: "imap.gmail.com".to_string(),
                port: 993,
                username: "you@gmail.com".to_string(),
                password: "your-app-password".to_string(),
                mailbox: "INBOX".to_string(),
            },
            smtp: SmtpConfig {
                host: "smtp.gmail.com".to_string(),
                port: 587,
                sender_name: "Workout Sync".to_string(),
                sender: "you@gmail.com".to_string(),
                receiver: "you@gmail.com".to_string(),
                password: "your-app-password".to_string(),
            },
            strava: StravaConfig {
                client_id: "12345".to_string(),
                client_secret: "your-client-secret".to_string(),
                refresh_token: "your-refresh-token".to_string(),
                grant_type: default_grant_type(),
                token_url: default_token_url(),
                api_base_url: default_api_base_url(),
            },
            workout: WorkoutConfig {
                link_prefix: default_link_prefix(),
                timezone: Some("Europe/London".to_string()),
            },
        }
    }
}
