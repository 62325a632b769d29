use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default = "default_secret_key")]
    pub secret_key: String,
    /// Run mode: `development` or `production`.
    #[serde(default = "default_mode")]
    pub mode: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/biocat.sqlite"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8086".to_string(),
        }
    }
}

/// Source feed locations used by the bootstrap import.
#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    #[serde(default = "default_plants_csv")]
    pub plants_csv: PathBuf,
    #[serde(default = "default_insects_csv")]
    pub insects_csv: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            plants_csv: default_plants_csv(),
            insects_csv: default_insects_csv(),
        }
    }
}

fn default_plants_csv() -> PathBuf {
    PathBuf::from("data/plants.csv")
}

fn default_insects_csv() -> PathBuf {
    PathBuf::from("data/insects.csv")
}

/// Admin credentials checked by `POST /admin/login`. The development defaults
/// are meant to be overridden from the environment in any real deployment.
#[derive(Debug, Deserialize, Clone)]
pub struct AdminConfig {
    #[serde(default = "default_admin_username")]
    pub username: String,
    #[serde(default = "default_admin_password")]
    pub password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: default_admin_username(),
            password: default_admin_password(),
        }
    }
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_admin_password() -> String {
    "dev-admin-password".to_string()
}

fn default_secret_key() -> String {
    "dev-secret-key".to_string()
}

fn default_mode() -> String {
    "development".to_string()
}

impl Config {
    /// A configuration with every default applied. Used when no config file
    /// exists and by tests.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig::default(),
            server: ServerConfig::default(),
            data: DataConfig::default(),
            admin: AdminConfig::default(),
            secret_key: default_secret_key(),
            mode: default_mode(),
        }
    }

    pub fn is_development(&self) -> bool {
        self.mode == "development"
    }
}

/// Loads configuration from a TOML file, then applies environment overrides.
///
/// A missing file is not an error — the development defaults apply, exactly
/// as if an empty file had been given. The environment variables `BIOCAT_DB`,
/// `SECRET_KEY`, `BIOCAT_ENV`, `BIOCAT_ADMIN_USERNAME`, and
/// `BIOCAT_ADMIN_PASSWORD` take precedence over the file.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        Config::minimal()
    };

    apply_env_overrides(&mut config);

    match config.mode.as_str() {
        "development" | "production" => {}
        other => anyhow::bail!(
            "Unknown run mode: '{}'. Must be development or production.",
            other
        ),
    }

    Ok(config)
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(db) = std::env::var("BIOCAT_DB") {
        config.db.path = PathBuf::from(db);
    }
    if let Ok(secret) = std::env::var("SECRET_KEY") {
        config.secret_key = secret;
    }
    if let Ok(mode) = std::env::var("BIOCAT_ENV") {
        config.mode = mode;
    }
    if let Ok(username) = std::env::var("BIOCAT_ADMIN_USERNAME") {
        config.admin.username = username;
    }
    if let Ok(password) = std::env::var("BIOCAT_ADMIN_PASSWORD") {
        config.admin.password = password;
    }
}
