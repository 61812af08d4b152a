//! External image host
//!
//! Post images and profile/cover images are handed to an external host
//! that returns a public URL. The host is addressed by the last path
//! segment of that URL (minus extension) when an image is destroyed.
//!
//! When no host is configured, `PassthroughAssetHost` stores the submitted
//! value as-is, which is what tests and dev mode use.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Args;
use crate::types::{ChorusError, Result};

#[async_trait]
pub trait AssetHost: Send + Sync {
    /// Upload an image (data URI or remote URL) and return its public URL
    async fn upload(&self, image: &str) -> Result<String>;

    /// Destroy a previously uploaded image by public id
    async fn destroy(&self, public_id: &str) -> Result<()>;
}

/// Public id of an uploaded asset: last path segment without extension
pub fn asset_public_id(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next()?;
    let segment = path.trim_end_matches('/').rsplit('/').next()?;
    let id = segment.split('.').next()?;
    (!id.is_empty()).then_some(id)
}

/// Build the asset host from configuration
pub fn from_args(args: &Args) -> Result<Arc<dyn AssetHost>> {
    match &args.asset_host_url {
        Some(url) => {
            info!(url = %url, "Using external asset host");
            Ok(Arc::new(HttpAssetHost::new(
                url,
                args.asset_host_key.clone(),
                args.asset_host_secret.clone(),
            )?))
        }
        None => {
            info!("No asset host configured, image references are stored as submitted");
            Ok(Arc::new(PassthroughAssetHost))
        }
    }
}

/// Stores image references unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughAssetHost;

#[async_trait]
impl AssetHost for PassthroughAssetHost {
    async fn upload(&self, image: &str) -> Result<String> {
        Ok(image.to_string())
    }

    async fn destroy(&self, public_id: &str) -> Result<()> {
        debug!(public_id, "Passthrough destroy (no-op)");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Image host reached over HTTP with basic auth.
///
/// `POST {base}/upload` with `{"file": ...}` answers `{"secure_url": ...}`;
/// `POST {base}/destroy` with `{"public_id": ...}` removes the image.
pub struct HttpAssetHost {
    base_url: String,
    key: Option<String>,
    secret: Option<String>,
    http_client: reqwest::Client,
}

impl HttpAssetHost {
    pub fn new(base_url: &str, key: Option<String>, secret: Option<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("chorus/0.1")
            .build()
            .map_err(|e| ChorusError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            key,
            secret,
            http_client,
        })
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.http_client.post(format!("{}/{}", self.base_url, path));
        match &self.key {
            Some(key) => request.basic_auth(key, self.secret.as_ref()),
            None => request,
        }
    }
}

#[async_trait]
impl AssetHost for HttpAssetHost {
    async fn upload(&self, image: &str) -> Result<String> {
        let response = self
            .post("upload")
            .json(&serde_json::json!({ "file": image }))
            .send()
            .await?
            .error_for_status()?;

        let body: UploadResponse = response.json().await?;
        debug!(url = %body.secure_url, "Asset uploaded");
        Ok(body.secure_url)
    }

    async fn destroy(&self, public_id: &str) -> Result<()> {
        let response = self
            .post("destroy")
            .json(&serde_json::json!({ "public_id": public_id }))
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(public_id, status = %response.status(), "Asset destroy rejected");
            return Err(ChorusError::Asset(format!(
                "destroy returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_id_from_url() {
        assert_eq!(
            asset_public_id("https://res.example.com/demo/image/upload/v1/abc123.png"),
            Some("abc123")
        );
        assert_eq!(asset_public_id("https://host/x/photo.tar.gz?v=2"), Some("photo"));
        assert_eq!(asset_public_id("plain"), Some("plain"));
        assert_eq!(asset_public_id("https://host/x/.hidden"), None);
        assert_eq!(asset_public_id(""), None);
    }

    #[test]
    fn test_passthrough_keeps_reference() {
        let host = PassthroughAssetHost;
        let url = tokio_test::block_on(host.upload("data:image/png;base64,AAAA")).unwrap();
        assert_eq!(url, "data:image/png;base64,AAAA");
        tokio_test::block_on(host.destroy("AAAA")).unwrap();
    }

    #[test]
    fn test_http_host_trims_base() {
        let host = HttpAssetHost::new("https://assets.local/", None, None).unwrap();
        assert_eq!(host.base_url, "https://assets.local");
    }
}
