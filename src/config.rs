use std::env;
use std::path::PathBuf;
use std::time::Duration;

use qrcode::EcLevel;

use crate::compositor::DEFAULT_LOGO_FRACTION;
use crate::qr::parse_ec_level;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub qr: QrConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub generate_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct QrConfig {
    pub logo_dir: PathBuf,
    pub logo_fraction: f64,
    pub ec_level: EcLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5555,
                static_dir: PathBuf::from("./static"),
                max_upload_bytes: 10 * 1024 * 1024,
                generate_timeout: Duration::from_secs(10),
            },
            qr: QrConfig {
                logo_dir: PathBuf::from("./static"),
                logo_fraction: DEFAULT_LOGO_FRACTION,
                ec_level: EcLevel::H,
            },
        }
    }
}

impl Config {
    /// Build the config from environment variables (and `.env`, if the caller
    /// loaded it), falling back to defaults for anything unset.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Config::default();

        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match value("PORT") {
            Some(v) => v.parse::<u16>().map_err(|e| anyhow::anyhow!("PORT={} is not a port: {}", v, e))?,
            None => defaults.server.port,
        };
        let max_upload_bytes = match value("MAX_UPLOAD_BYTES") {
            Some(v) => v
                .parse::<usize>()
                .map_err(|e| anyhow::anyhow!("MAX_UPLOAD_BYTES={} is not a byte count: {}", v, e))?,
            None => defaults.server.max_upload_bytes,
        };
        let generate_timeout = match value("GENERATE_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(
                v.parse::<u64>()
                    .map_err(|e| anyhow::anyhow!("GENERATE_TIMEOUT_SECS={} is not a number: {}", v, e))?,
            ),
            None => defaults.server.generate_timeout,
        };
        let logo_fraction = match value("LOGO_FRACTION") {
            Some(v) => v
                .parse::<f64>()
                .map_err(|e| anyhow::anyhow!("LOGO_FRACTION={} is not a number: {}", v, e))?,
            None => defaults.qr.logo_fraction,
        };
        let ec_level = match value("QR_EC_LEVEL") {
            Some(v) => parse_ec_level(&v).ok_or_else(|| anyhow::anyhow!("QR_EC_LEVEL={} is not one of L, M, Q, H", v))?,
            None => defaults.qr.ec_level,
        };

        let config = Config {
            server: ServerConfig {
                host: value("HOST").unwrap_or(defaults.server.host),
                port,
                static_dir: value("STATIC_DIR").map(PathBuf::from).unwrap_or(defaults.server.static_dir),
                max_upload_bytes,
                generate_timeout,
            },
            qr: QrConfig {
                logo_dir: value("LOGO_DIR").map(PathBuf::from).unwrap_or(defaults.qr.logo_dir),
                logo_fraction,
                ec_level,
            },
        };

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.qr.logo_fraction > 0.0 && self.qr.logo_fraction <= 1.0) {
            anyhow::bail!("LOGO_FRACTION must be in (0, 1], got {}", self.qr.logo_fraction);
        }

        if self.server.max_upload_bytes == 0 {
            anyhow::bail!("MAX_UPLOAD_BYTES must be positive");
        }

        if self.server.generate_timeout.is_zero() {
            anyhow::bail!("GENERATE_TIMEOUT_SECS must be positive");
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:5555");
        assert_eq!(config.qr.logo_fraction, 0.25);
        assert_eq!(config.qr.ec_level, EcLevel::H);
        assert_eq!(config.server.static_dir, PathBuf::from("./static"));
    }

    #[test]
    fn env_values_override_defaults() {
        let config = load(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("LOGO_FRACTION", "0.2"),
            ("QR_EC_LEVEL", "q"),
            ("LOGO_DIR", "/srv/logos"),
        ])
        .unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.qr.logo_fraction, 0.2);
        assert_eq!(config.qr.ec_level, EcLevel::Q);
        assert_eq!(config.qr.logo_dir, PathBuf::from("/srv/logos"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(load(&[("PORT", "seventy")]).is_err());
        assert!(load(&[("LOGO_FRACTION", "1.5")]).is_err());
        assert!(load(&[("LOGO_FRACTION", "0")]).is_err());
        assert!(load(&[("QR_EC_LEVEL", "ultra")]).is_err());
        assert!(load(&[("MAX_UPLOAD_BYTES", "0")]).is_err());
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = load(&[("PORT", "  ")]).unwrap();
        assert_eq!(config.server.port, 5555);
    }
}
