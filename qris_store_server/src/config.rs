use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use chrono::Duration;
use log::*;
use qris_common::{parse_boolean_flag, Secret};
use qris_store_engine::{merchant::DEFAULT_MAX_UPLOAD_BYTES, qris::DEFAULT_QR_VALIDITY_SECS};

const DEFAULT_QRS_HOST: &str = "127.0.0.1";
const DEFAULT_QRS_PORT: u16 = 8380;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/qris_store.db";
const DEFAULT_MERCHANT_PROFILE_PATH: &str = "data/merchant_profile.json";
const DEV_PAYMENT_SECRET: &str = "qris-store-development-secret";
const DEFAULT_EXPIRY_SWEEP_SECS: u64 = 60;
const DEFAULT_PAID_NOTIFY_SECS: u64 = 30;
const DEFAULT_STOCK_REPORT_SECS: u64 = 3600;
const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;
const DEFAULT_STOCK_REPORT_HOUR: u32 = 20;
/// Western Indonesia Time
const DEFAULT_UTC_OFFSET_HOURS: i32 = 7;
/// One day
const MAX_QR_VALIDITY_SECS: i64 = 86_400;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Run the embedded migrations at start-up
    pub run_migrations: bool,
    pub merchant_profile_path: PathBuf,
    /// The HMAC key for payment verification hashes. Changing it invalidates every pending order.
    pub payment_secret: Secret<String>,
    pub qr_validity: Duration,
    /// Chat user ids allowed to call the admin routes. Empty means nobody is.
    pub admin_ids: Vec<String>,
    pub max_upload_bytes: usize,
    pub scheduler: SchedulerConfig,
}

#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    pub expiry_sweep_interval: std::time::Duration,
    pub paid_notify_interval: std::time::Duration,
    pub stock_report_interval: std::time::Duration,
    pub low_stock_threshold: i64,
    /// The local hour (0-23) at which the daily stock report goes out
    pub stock_report_hour: u32,
    pub utc_offset_hours: i32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            expiry_sweep_interval: std::time::Duration::from_secs(DEFAULT_EXPIRY_SWEEP_SECS),
            paid_notify_interval: std::time::Duration::from_secs(DEFAULT_PAID_NOTIFY_SECS),
            stock_report_interval: std::time::Duration::from_secs(DEFAULT_STOCK_REPORT_SECS),
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            stock_report_hour: DEFAULT_STOCK_REPORT_HOUR,
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_QRS_HOST.to_string(),
            port: DEFAULT_QRS_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            run_migrations: true,
            merchant_profile_path: PathBuf::from(DEFAULT_MERCHANT_PROFILE_PATH),
            payment_secret: Secret::new(DEV_PAYMENT_SECRET.to_string()),
            qr_validity: Duration::seconds(DEFAULT_QR_VALIDITY_SECS),
            admin_ids: Vec::new(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("QRS_HOST").ok().unwrap_or_else(|| DEFAULT_QRS_HOST.into());
        let port = parse_or_default("QRS_PORT", env::var("QRS_PORT").ok(), DEFAULT_QRS_PORT);
        let database_url = env::var("QRS_DATABASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ QRS_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.to_string()
        });
        let run_migrations = parse_boolean_flag(env::var("QRS_RUN_MIGRATIONS").ok(), true);
        let merchant_profile_path = env::var("QRS_MERCHANT_PROFILE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_MERCHANT_PROFILE_PATH));
        let payment_secret = match env::var("QRS_PAYMENT_SECRET") {
            Ok(s) if !s.trim().is_empty() => Secret::new(s),
            _ => {
                warn!(
                    "🚨️🚨️🚨️ QRS_PAYMENT_SECRET is not set. A well-known development secret is being used, so payment \
                     verification hashes can be forged. DO NOT run a real store like this. 🚨️🚨️🚨️"
                );
                Secret::new(DEV_PAYMENT_SECRET.to_string())
            },
        };
        let qr_validity_secs = parse_or_default(
            "QRS_QR_VALIDITY_SECS",
            env::var("QRS_QR_VALIDITY_SECS").ok(),
            DEFAULT_QR_VALIDITY_SECS,
        );
        let admin_ids = parse_admin_ids(env::var("QRS_ADMIN_IDS").ok());
        if admin_ids.is_empty() {
            warn!("🪛️ QRS_ADMIN_IDS is empty. Nobody will be able to use the admin routes.");
        }
        let max_upload_bytes =
            parse_or_default("QRS_MAX_UPLOAD_BYTES", env::var("QRS_MAX_UPLOAD_BYTES").ok(), DEFAULT_MAX_UPLOAD_BYTES);
        Self {
            host,
            port,
            database_url,
            run_migrations,
            merchant_profile_path,
            payment_secret,
            qr_validity: qr_validity(qr_validity_secs),
            admin_ids,
            max_upload_bytes,
            scheduler: SchedulerConfig::from_env_or_default(),
        }
    }
}

impl SchedulerConfig {
    pub fn from_env_or_default() -> Self {
        let secs = |name: &str, default: u64| {
            let secs = parse_or_default(name, env::var(name).ok(), default);
            std::time::Duration::from_secs(secs.max(1))
        };
        let stock_report_hour = parse_or_default(
            "QRS_STOCK_REPORT_HOUR",
            env::var("QRS_STOCK_REPORT_HOUR").ok(),
            DEFAULT_STOCK_REPORT_HOUR,
        );
        let stock_report_hour = if stock_report_hour < 24 {
            stock_report_hour
        } else {
            warn!("🪛️ QRS_STOCK_REPORT_HOUR must be between 0 and 23. Using {DEFAULT_STOCK_REPORT_HOUR}");
            DEFAULT_STOCK_REPORT_HOUR
        };
        let utc_offset_hours =
            parse_or_default("QRS_UTC_OFFSET_HOURS", env::var("QRS_UTC_OFFSET_HOURS").ok(), DEFAULT_UTC_OFFSET_HOURS);
        Self {
            expiry_sweep_interval: secs("QRS_EXPIRY_SWEEP_SECS", DEFAULT_EXPIRY_SWEEP_SECS),
            paid_notify_interval: secs("QRS_PAID_NOTIFY_SECS", DEFAULT_PAID_NOTIFY_SECS),
            stock_report_interval: secs("QRS_STOCK_REPORT_SECS", DEFAULT_STOCK_REPORT_SECS),
            low_stock_threshold: parse_or_default(
                "QRS_LOW_STOCK_THRESHOLD",
                env::var("QRS_LOW_STOCK_THRESHOLD").ok(),
                DEFAULT_LOW_STOCK_THRESHOLD,
            ),
            stock_report_hour,
            utc_offset_hours: utc_offset_hours.clamp(-12, 14),
        }
    }
}

/// Parses `value`, logging and falling back to `default` when it is missing or invalid.
fn parse_or_default<T>(name: &str, value: Option<String>, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match value {
        None => {
            debug!("🪛️ {name} is not set. Using the default value of {default}");
            default
        },
        Some(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
    }
}

fn qr_validity(secs: i64) -> Duration {
    if secs > MAX_QR_VALIDITY_SECS {
        warn!("🪛️ QRS_QR_VALIDITY_SECS may be at most {MAX_QR_VALIDITY_SECS}. Using {MAX_QR_VALIDITY_SECS}");
    }
    Duration::seconds(secs.clamp(1, MAX_QR_VALIDITY_SECS))
}

fn parse_admin_ids(value: Option<String>) -> Vec<String> {
    value
        .map(|s| s.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect())
        .unwrap_or_default()
}
