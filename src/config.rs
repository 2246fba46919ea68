
use crate::links::LinkConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Upper bound for acquiring a backend connection, in milliseconds.
    pub db_connect_timeout_ms: u64,
    pub db_max_connections: u32,
    pub db_heartbeat_interval_secs: u64,
    pub links: LinkConfig,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
    pub body_limit_bytes: usize,
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number", name)),
        _ => Ok(default),
    }
}

fn link_or(name: &str, default: String) -> anyhow::Result<String> {
    let Ok(raw) = std::env::var(name) else {
        return Ok(default);
    };
    if raw.trim().is_empty() {
        anyhow::bail!("{} cannot be empty", name);
    }
    if !raw.starts_with("http://") && !raw.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    url::Url::parse(&raw).map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", name, e))?;
    Ok(raw)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let default_links = LinkConfig::default();

        let config = Self {
            database_url: std::env::var("DATABASE_URL")
                .or_else(|_| std::env::var("DB_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DATABASE_URL or DB_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DATABASE_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            db_connect_timeout_ms: parse_or("DB_CONNECT_TIMEOUT_MS", 30_000)?,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 10)?,
            db_heartbeat_interval_secs: parse_or("DB_HEARTBEAT_INTERVAL_SECS", 10)?,
            links: LinkConfig {
                calculator: link_or("CALCULATOR_LINK", default_links.calculator)?,
                qualification: link_or("QUALIFICATION_LINK", default_links.qualification)?,
                photo_upload: link_or("PHOTO_UPLOAD_LINK", default_links.photo_upload)?,
                appointment_booking: link_or(
                    "APPOINTMENT_BOOKING_LINK",
                    default_links.appointment_booking,
                )?,
            },
            rate_limit_per_second: parse_or("RATE_LIMIT_PER_SECOND", 10)?,
            rate_limit_burst: parse_or("RATE_LIMIT_BURST", 20)?,
            body_limit_bytes: parse_or("BODY_LIMIT_BYTES", 1024 * 1024)?,
        };

        if config.db_heartbeat_interval_secs == 0 {
            anyhow::bail!("DB_HEARTBEAT_INTERVAL_SECS must be greater than 0");
        }
        if config.rate_limit_per_second == 0 || config.rate_limit_burst == 0 {
            anyhow::bail!("RATE_LIMIT_PER_SECOND and RATE_LIMIT_BURST must be greater than 0");
        }

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!(
            "Database URL: {}...",
            config.database_url.chars().take(20).collect::<String>()
        );
        tracing::debug!("Server Port: {}", config.port);
        tracing::debug!(
            "Backend connect timeout: {}ms, heartbeat every {}s",
            config.db_connect_timeout_ms,
            config.db_heartbeat_interval_secs
        );
        tracing::debug!("Follow-up links: {:?}", config.links);

        Ok(config)
    }
}
