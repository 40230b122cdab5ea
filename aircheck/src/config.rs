use serde::{Deserialize, Serialize};
use std::{env, fs, net::SocketAddr, str::FromStr};

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub http: Http,
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub source: SourcePoll,
    #[serde(default)]
    pub recorder: Recorder,
    #[serde(default)]
    pub database: Database,
    #[serde(default)]
    pub upload: Upload,
    #[serde(default)]
    pub smtp: Smtp,
    #[serde(default)]
    pub push: Push,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Http {
    #[serde(default = "default_http_listen")]
    pub listen: SocketAddr,
    #[serde(default)]
    pub cors: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_dir")]
    pub dir: String,
}

/// The polled broadcast status endpoints, tried in order each cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePoll {
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,
    #[serde(default)]
    pub check_tick_time: CheckSourceTickTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckSourceTickTime(pub u64);

impl Default for CheckSourceTickTime {
    fn default() -> Self {
        CheckSourceTickTime(15 * 1000)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recorder {
    #[serde(default = "default_working_dir")]
    pub working_dir: String,
    /// Recordings at or under this length are treated as test streams and
    /// never published.
    #[serde(default = "default_minimum_length")]
    pub minimum_length: f64,
    #[serde(default = "default_true")]
    pub trim_silence: bool,
    #[serde(default = "default_true")]
    pub backup: bool,
    #[serde(default = "default_genre")]
    pub genre: String,
    #[serde(default)]
    pub notification_delay: NotificationDelay,
}

/// Minutes to wait before the "still streaming" push fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationDelay(pub u64);

impl Default for NotificationDelay {
    fn default() -> Self {
        NotificationDelay(
            env::var("NOTIFICATION_DELAY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
        )
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Database {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Upload {
    /// Remote file store base URL; publishing fails when unset.
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_upload_username")]
    pub username: String,
    #[serde(default = "default_upload_password")]
    pub password: String,
    #[serde(default = "default_upload_path")]
    pub upload_path: String,
    /// Public site base used to build download links.
    #[serde(default)]
    pub public_base: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Smtp {
    #[serde(default = "default_smtp_server")]
    pub server: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default = "default_smtp_username")]
    pub username: String,
    #[serde(default = "default_smtp_password")]
    pub password: String,
    #[serde(default = "default_email_from")]
    pub from: String,
    #[serde(default = "default_email_to")]
    pub to: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Push {
    /// Webhook endpoint of the push relay; pushes are skipped when unset.
    #[serde(default = "default_push_url")]
    pub url: String,
    #[serde(default = "default_push_token")]
    pub token: String,
    #[serde(default = "default_android_topic")]
    pub android_topic: String,
    #[serde(default = "default_web_topic")]
    pub web_topic: String,
}

fn default_http_listen() -> SocketAddr {
    SocketAddr::from_str(&format!(
        "0.0.0.0:{}",
        env::var("PORT").unwrap_or(String::from("7788"))
    ))
    .expect("invalid listen address")
}

impl Default for Http {
    fn default() -> Self {
        Self {
            listen: default_http_listen(),
            cors: Default::default(),
        }
    }
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: default_log_dir(),
        }
    }
}

impl Default for SourcePoll {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            check_tick_time: Default::default(),
        }
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self {
            working_dir: default_working_dir(),
            minimum_length: default_minimum_length(),
            trim_silence: true,
            backup: true,
            genre: default_genre(),
            notification_delay: Default::default(),
        }
    }
}

impl Default for Database {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

impl Default for Upload {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: default_upload_username(),
            password: default_upload_password(),
            upload_path: default_upload_path(),
            public_base: String::new(),
        }
    }
}

impl Default for Smtp {
    fn default() -> Self {
        Self {
            server: default_smtp_server(),
            port: default_smtp_port(),
            username: default_smtp_username(),
            password: default_smtp_password(),
            from: default_email_from(),
            to: default_email_to(),
        }
    }
}

impl Default for Push {
    fn default() -> Self {
        Self {
            url: default_push_url(),
            token: default_push_token(),
            android_topic: default_android_topic(),
            web_topic: default_web_topic(),
        }
    }
}

fn default_log_level() -> String {
    env::var("LOG_LEVEL").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug".to_string()
        } else {
            "info".to_string()
        }
    })
}

fn default_log_dir() -> String {
    String::from("logs")
}

fn default_endpoints() -> Vec<String> {
    vec![String::from("http://127.0.0.1:8000")]
}

fn default_working_dir() -> String {
    String::from("currently_recording")
}

fn default_minimum_length() -> f64 {
    env::var("MINIMUM_RECORDING_LENGTH")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10.0)
}

fn default_true() -> bool {
    true
}

fn default_genre() -> String {
    String::from("Broadcast Archives")
}

fn default_database_url() -> String {
    env::var("DATABASE_URL").unwrap_or_else(|_| String::from("sqlite://aircheck.db?mode=rwc"))
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_upload_username() -> String {
    env::var("UPLOAD_USERNAME").unwrap_or_default()
}

fn default_upload_password() -> String {
    env::var("UPLOAD_PASSWORD").unwrap_or_default()
}

fn default_upload_path() -> String {
    String::from("recordings")
}

fn default_smtp_server() -> String {
    env::var("SMTP_SERVER").unwrap_or_default()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_username() -> String {
    env::var("SMTP_USERNAME").unwrap_or_default()
}

fn default_smtp_password() -> String {
    env::var("SMTP_PASSWORD").unwrap_or_default()
}

fn default_email_from() -> String {
    env::var("EMAIL_FROM").unwrap_or_else(|_| default_smtp_username())
}

fn default_email_to() -> String {
    env::var("EMAIL_TO").unwrap_or_else(|_| default_smtp_username())
}

fn default_push_url() -> String {
    env::var("PUSH_URL").unwrap_or_default()
}

fn default_push_token() -> String {
    env::var("PUSH_TOKEN").unwrap_or_default()
}

fn default_android_topic() -> String {
    String::from("news")
}

fn default_web_topic() -> String {
    String::from("broadcasts")
}

impl Config {
    pub fn parse(path: Option<String>) -> Self {
        let result = fs::read_to_string(path.unwrap_or(String::from("aircheck.toml")))
            .or(fs::read_to_string("/etc/aircheck/aircheck.toml"))
            .unwrap_or("".to_string());
        let cfg: Self = toml::from_str(result.as_str()).expect("config parse error");
        match cfg.validate() {
            Ok(_) => cfg,
            Err(err) => panic!("config validate [{}]", err),
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.source.endpoints.is_empty() {
            return Err(anyhow::anyhow!("at least one status endpoint is required"));
        }
        for endpoint in &self.source.endpoints {
            url::Url::parse(endpoint)
                .map_err(|e| anyhow::anyhow!("invalid status endpoint [{endpoint}]: {e}"))?;
        }
        if self.recorder.minimum_length < 0.0 {
            return Err(anyhow::anyhow!("minimum_length must not be negative"));
        }
        Ok(())
    }
}
