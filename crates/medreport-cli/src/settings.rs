use config::{Config, ConfigError, Environment};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            url: default_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
}

impl Settings {
    /// Defaults layered under `MEDREPORT_`-prefixed environment variables,
    /// e.g. `MEDREPORT_SERVER__URL`, `MEDREPORT_SERVER__TIMEOUT_SECS`.
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.url", default_url())?
            .set_default("server.timeout_secs", default_timeout_secs() as i64)?
            .add_source(
                Environment::with_prefix("MEDREPORT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

fn default_url() -> String {
    "http://127.0.0.1:80".to_string()
}

fn default_timeout_secs() -> u64 {
    600
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("MEDREPORT_") {
                env::remove_var(&key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.url, "http://127.0.0.1:80");
        assert_eq!(settings.server.timeout_secs, 600);
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        clean_env();
        env::set_var("MEDREPORT_SERVER__URL", "http://analysis.internal:8080");
        env::set_var("MEDREPORT_SERVER__TIMEOUT_SECS", "120");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.url, "http://analysis.internal:8080");
        assert_eq!(settings.server.timeout_secs, 120);

        env::remove_var("MEDREPORT_SERVER__URL");
        env::remove_var("MEDREPORT_SERVER__TIMEOUT_SECS");
    }
}
