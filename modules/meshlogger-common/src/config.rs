use std::env;

use crate::error::MeshLoggerError;
use crate::types::Band;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // SQLite database written by the logger
    pub database_url: String,

    // Web server
    pub web_host: String,
    pub web_port: u16,

    /// Bands the API answers for, in display order.
    pub bands: Vec<Band>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, MeshLoggerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup (tests pass a map instead of the process env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MeshLoggerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let web_port = match lookup("WEB_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| MeshLoggerError::Config(format!("WEB_PORT must be a number, got \"{raw}\"")))?,
            None => 3000,
        };

        let bands = match lookup("MESHLOGGER_BANDS") {
            Some(raw) => parse_bands(&raw)?,
            None => Band::ALL.to_vec(),
        };

        Ok(Self {
            database_url: lookup("MESHLOGGER_DATABASE_URL")
                .unwrap_or_else(|| "sqlite://nodes.db?mode=ro".to_string()),
            web_host: lookup("WEB_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            web_port,
            bands,
        })
    }
}

fn parse_bands(raw: &str) -> Result<Vec<Band>, MeshLoggerError> {
    let mut bands = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let band: Band = part
            .parse()
            .map_err(|_| MeshLoggerError::Config(format!("MESHLOGGER_BANDS: unknown band \"{part}\"")))?;
        if !bands.contains(&band) {
            bands.push(band);
        }
    }
    if bands.is_empty() {
        return Err(MeshLoggerError::Config(
            "MESHLOGGER_BANDS must name at least one band".to_string(),
        ));
    }
    Ok(bands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, MeshLoggerError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_env_is_empty() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.web_host, "0.0.0.0");
        assert_eq!(config.web_port, 3000);
        assert_eq!(config.bands, vec![Band::Mhz433, Band::Mhz868]);
        assert!(config.database_url.starts_with("sqlite://"));
    }

    #[test]
    fn band_list_is_deduplicated_and_ordered() {
        let config = config_from(&[("MESHLOGGER_BANDS", "868, 433,868")]).unwrap();
        assert_eq!(config.bands, vec![Band::Mhz868, Band::Mhz433]);
    }

    #[test]
    fn single_band_deployment() {
        let config = config_from(&[("MESHLOGGER_BANDS", "868")]).unwrap();
        assert_eq!(config.bands, vec![Band::Mhz868]);
    }

    #[test]
    fn rejects_unknown_band() {
        let err = config_from(&[("MESHLOGGER_BANDS", "433,915")]).unwrap_err();
        assert!(matches!(err, MeshLoggerError::Config(_)));
    }

    #[test]
    fn rejects_empty_band_list() {
        assert!(config_from(&[("MESHLOGGER_BANDS", " , ")]).is_err());
    }

    #[test]
    fn rejects_bad_port() {
        let err = config_from(&[("WEB_PORT", "http")]).unwrap_err();
        assert!(err.to_string().contains("WEB_PORT"));
    }
}
