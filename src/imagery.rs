//! Client for the image hosting service.
//!
//! Every hoarding photo lives in one folder on the host. Uploads and
//! destroys are signed requests; the public id needed to destroy an image
//! later is recovered from the delivery URL we stored.

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use tracing::{info, warn};

fn default_base_url() -> String {
    "https://api.cloudinary.com".to_string()
}

fn default_folder() -> String {
    "hoardings".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageHostConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    #[serde(default = "default_folder")]
    pub folder: String,
}

/// A successfully stored image.
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub secure_url: String,
    pub public_id: String,
}

pub struct ImageHost {
    config: ImageHostConfig,
    client: reqwest::Client,
}

impl ImageHost {
    pub fn new(config: ImageHostConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/v1_1/{}/image/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.cloud_name,
            action
        )
    }

    /// Upload an image into the configured folder.
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<StoredImage> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = api_sign_request(
            &[("folder", &self.config.folder), ("timestamp", &timestamp)],
            &self.config.api_secret,
        );

        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(content_type)?;
        let form = Form::new()
            .part("file", part)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", self.config.folder.clone())
            .text("signature", signature);

        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .context("Image upload request failed")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Image upload failed: {}", error_text);
        }

        let body = response.json::<serde_json::Value>().await?;
        let stored = match (body["secure_url"].as_str(), body["public_id"].as_str()) {
            (Some(secure_url), Some(public_id)) => StoredImage {
                secure_url: secure_url.to_string(),
                public_id: public_id.to_string(),
            },
            _ => anyhow::bail!("Image upload failed."),
        };

        info!("Uploaded image {} as {}", filename, stored.public_id);
        Ok(stored)
    }

    /// Delete an image by its public id. A missing image is tolerated,
    /// any other failure is not.
    pub async fn destroy(&self, public_id: &str) -> Result<()> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = api_sign_request(
            &[("public_id", public_id), ("timestamp", &timestamp)],
            &self.config.api_secret,
        );

        let form = Form::new()
            .text("public_id", public_id.to_string())
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature);

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .multipart(form)
            .send()
            .await
            .context("Image destroy request failed")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Image destroy failed: {}", error_text);
        }

        let body = response.json::<serde_json::Value>().await?;
        match body["result"].as_str() {
            Some("ok") => info!("Destroyed image {}", public_id),
            other => warn!("Image destroy for {} answered {:?}", public_id, other),
        }
        Ok(())
    }

    /// Recover the public id from a stored delivery URL: the last path
    /// segment minus its extension, under the configured folder.
    pub fn public_id_from_url(&self, url: &str) -> Option<String> {
        let last = url.rsplit('/').next()?;
        let stem = last.split('.').next()?;
        if stem.is_empty() {
            return None;
        }
        Some(format!("{}/{}", self.config.folder, stem))
    }
}

/// Sign request parameters: alphabetical `key=value` pairs joined with
/// `&`, secret appended, SHA-1, lowercase hex.
fn api_sign_request(params: &[(&str, &str)], secret: &str) -> String {
    let mut sorted: Vec<(&str, &str)> = params.to_vec();
    sorted.sort_by_key(|(key, _)| *key);
    let to_sign: String = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(secret.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> ImageHost {
        ImageHost::new(ImageHostConfig {
            base_url: default_base_url(),
            cloud_name: "demo".to_string(),
            api_key: "key".to_string(),
            api_secret: "top-secret".to_string(),
            folder: "hoardings".to_string(),
        })
    }

    #[test]
    fn signature_matches_known_digests() {
        assert_eq!(
            api_sign_request(
                &[("folder", "hoardings"), ("timestamp", "1700000000")],
                "top-secret"
            ),
            "c2a29ac1180bb3b306117b7e0caa5fc352b8b945"
        );
        assert_eq!(
            api_sign_request(
                &[("public_id", "hoardings/a1b2c3"), ("timestamp", "1700000000")],
                "top-secret"
            ),
            "d859a6c8b10fc867690d2f8936cbed39dcd5245b"
        );
    }

    #[test]
    fn signature_sorts_parameters_alphabetically() {
        let forward = api_sign_request(&[("folder", "hoardings"), ("timestamp", "1")], "s");
        let reversed = api_sign_request(&[("timestamp", "1"), ("folder", "hoardings")], "s");
        assert_eq!(forward, reversed);
    }

    #[test]
    fn public_id_comes_from_the_last_url_segment() {
        let host = host();
        assert_eq!(
            host.public_id_from_url(
                "https://res.cloudinary.com/demo/image/upload/v1700000000/hoardings/a1b2c3.jpg"
            ),
            Some("hoardings/a1b2c3".to_string())
        );
        assert_eq!(
            host.public_id_from_url("https://img.example/hoardings/plain"),
            Some("hoardings/plain".to_string())
        );
        assert_eq!(host.public_id_from_url("https://img.example/hoardings/"), None);
    }

    #[test]
    fn upload_endpoint_is_under_the_cloud_name() {
        assert_eq!(
            host().endpoint("upload"),
            "https://api.cloudinary.com/v1_1/demo/image/upload"
        );
    }
}
