use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use hoardmap::imagery::ImageHostConfig;
use hoardmap::mail::MailConfig;
use hoardmap::vision::VisionConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub elasticsearch: ElasticsearchConfig,
    pub imagery: ImageHostConfig,
    /// Omit the section to run without vision autofill.
    pub vision: Option<VisionConfig>,
    pub mail: MailConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ElasticsearchConfig {
    #[serde(default = "default_es_url")]
    pub url: String,
    #[serde(default = "default_index")]
    pub index: String,
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            url: default_es_url(),
            index: default_index(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_es_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_index() -> String {
    "hoardings".to_string()
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [imagery]
            cloud_name = "demo"
            api_key = "key"
            api_secret = "secret"

            [mail]
            relay_url = "https://relay.example/send"
            api_token = "token"
            admin_email = "admin@example.com"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:8080");
        assert_eq!(config.elasticsearch.index, "hoardings");
        assert_eq!(config.imagery.folder, "hoardings");
        assert!(config.vision.is_none());
    }

    #[test]
    fn vision_section_is_optional_but_parsed() {
        let config: Config = toml::from_str(
            r#"
            [imagery]
            cloud_name = "demo"
            api_key = "key"
            api_secret = "secret"

            [vision]
            api_key = "vkey"

            [mail]
            relay_url = "https://relay.example/send"
            api_token = "token"
            admin_email = "admin@example.com"
            "#,
        )
        .unwrap();
        let vision = config.vision.unwrap();
        assert_eq!(vision.model, "gemini-pro-vision");
        assert_eq!(vision.api_key, "vkey");
    }
}
