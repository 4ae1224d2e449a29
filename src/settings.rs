use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Api {
    /// Backend base URL, trailing slash included, e.g.
    /// `http://localhost:8000/api/`.
    pub base_url: String,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub api: Api,
}

impl Settings {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .build()?;

        config.try_deserialize()
    }
}
