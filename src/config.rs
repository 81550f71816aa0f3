use crate::services::CloudinaryConfig;
use anyhow::Context;
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_BADGE_IMAGE: &str = "/images/verified-badge.png";
const DEFAULT_MAX_BADGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub database_max_connections: u32,
    pub badges: BadgeStorageConfig,
    pub default_badge: String,
    pub max_badge_bytes: usize,
    pub expose_error_details: bool,
}

#[derive(Debug, Clone)]
pub enum BadgeStorageConfig {
    Local {
        root_dir: PathBuf,
        url_prefix: String,
    },
    Cloudinary(CloudinaryConfig),
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| var(key).with_context(|| format!("{key} not set"));

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDR must be host:port")?;

        let database_max_connections = match var("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse::<u32>()
                .context("DATABASE_MAX_CONNECTIONS must be a number")?,
            None => 10,
        };

        let badges = match var("BADGE_STORAGE").as_deref().unwrap_or("local") {
            "local" => BadgeStorageConfig::Local {
                root_dir: var("BADGE_UPLOAD_DIR")
                    .unwrap_or_else(|| "public/uploads/badges".to_string())
                    .into(),
                url_prefix: var("BADGE_URL_PREFIX")
                    .unwrap_or_else(|| "/uploads/badges".to_string()),
            },
            "cloudinary" => BadgeStorageConfig::Cloudinary(CloudinaryConfig {
                cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
                api_key: required("CLOUDINARY_API_KEY")?,
                api_secret: required("CLOUDINARY_API_SECRET")?,
                folder: var("CLOUDINARY_FOLDER").unwrap_or_else(|| "event-badges".to_string()),
            }),
            other => anyhow::bail!("unknown BADGE_STORAGE backend: {other}"),
        };

        let max_badge_bytes = match var("MAX_BADGE_BYTES") {
            Some(raw) => raw
                .parse::<usize>()
                .context("MAX_BADGE_BYTES must be a number")?,
            None => DEFAULT_MAX_BADGE_BYTES,
        };

        let production = var("APP_ENV").is_some_and(|env| env.eq_ignore_ascii_case("production"));
        let expose_error_details = match var("EXPOSE_ERROR_DETAILS") {
            Some(raw) => parse_flag(&raw).context("EXPOSE_ERROR_DETAILS must be a boolean")?,
            None => !production,
        };

        Ok(Self {
            bind_addr,
            database_url: required("DATABASE_URL")?,
            database_max_connections,
            badges,
            default_badge: var("DEFAULT_BADGE_IMAGE")
                .unwrap_or_else(|| DEFAULT_BADGE_IMAGE.to_string()),
            max_badge_bytes,
            expose_error_details,
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
