use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Serialize;

/// Application-level constants
pub const APP_NAME: &str = "OpenClinic";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_BIND: &str = "127.0.0.1:8000";
const DEFAULT_PAGE_SIZE: u32 = 10;

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "info,openclinic_lib=debug,tower_http=info"
}

/// Clinic details shown on every page header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClinicInfo {
    pub name: String,
    pub hours: String,
    pub address: String,
    pub phone: String,
    pub url: String,
}

impl Default for ClinicInfo {
    fn default() -> Self {
        Self {
            name: "My Clinic".into(),
            hours: "L-V 9am-3pm, S 10am-1pm".into(),
            address: "Sesame Street".into(),
            phone: "999 66 66 66".into(),
            url: "#".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub media_root: PathBuf,
    pub bind_addr: SocketAddr,
    pub page_size: u32,
    pub clinic: ClinicInfo,
}

impl Config {
    /// Read `OPENCLINIC_*` environment variables, defaulting what is unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = var("OPENCLINIC_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(app_data_dir);
        let database_path = var("OPENCLINIC_DATABASE")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("openclinic.db"));
        let media_root = var("OPENCLINIC_MEDIA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("media"));

        let bind_addr = parse_or_default("OPENCLINIC_BIND", var("OPENCLINIC_BIND"), || {
            DEFAULT_BIND.parse().unwrap_or(SocketAddr::from(([127, 0, 0, 1], 8000)))
        });
        let page_size = parse_or_default("OPENCLINIC_PAGE_SIZE", var("OPENCLINIC_PAGE_SIZE"), || {
            DEFAULT_PAGE_SIZE
        })
        .max(1);

        let defaults = ClinicInfo::default();
        let clinic = ClinicInfo {
            name: var("OPENCLINIC_CLINIC_NAME").unwrap_or(defaults.name),
            hours: var("OPENCLINIC_CLINIC_HOURS").unwrap_or(defaults.hours),
            address: var("OPENCLINIC_CLINIC_ADDRESS").unwrap_or(defaults.address),
            phone: var("OPENCLINIC_CLINIC_PHONE").unwrap_or(defaults.phone),
            url: var("OPENCLINIC_CLINIC_URL").unwrap_or(defaults.url),
        };

        Self {
            data_dir,
            database_path,
            media_root,
            bind_addr,
            page_size,
            clinic,
        }
    }
}

fn parse_or_default<T: std::str::FromStr>(
    key: &str,
    raw: Option<String>,
    default: impl FnOnce() -> T,
) -> T {
    match raw {
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %value, "Invalid configuration value, using default");
            default()
        }),
        None => default(),
    }
}

/// Get the application data directory
/// ~/OpenClinic/ when a home directory is known, `./OpenClinic` otherwise.
pub fn app_data_dir() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(APP_NAME),
        None => {
            tracing::warn!("Cannot determine home directory, using working directory");
            PathBuf::from(APP_NAME)
        }
    }
}
