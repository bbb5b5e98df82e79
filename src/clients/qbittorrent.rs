use anyhow::{Context, Result, bail};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QBitConfig {
    pub base_url: String,

    pub username: String,

    pub password: String,

    /// Category assigned to every added torrent; empty for none.
    pub category: String,

    pub paused: bool,
}

impl Default for QBitConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            username: "admin".to_string(),
            password: "adminadmin".to_string(),
            category: "tv".to_string(),
            paused: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QBitClient {
    client: Client,
    config: QBitConfig,
}

impl QBitClient {
    pub fn new(config: QBitConfig) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(crate::USER_AGENT)
            .build()
            .context("Failed to build qBittorrent HTTP client")?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    pub async fn login(&self) -> Result<()> {
        let url = self.endpoint("/api/v2/auth/login");

        let params = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .header("Referer", &self.config.base_url)
            .form(&params)
            .send()
            .await
            .context("Failed to connect to qBittorrent")?;

        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::OK && body.contains("Ok") {
            debug!("Successfully authenticated with qBittorrent");
            Ok(())
        } else if body.contains("Fails") {
            bail!("qBittorrent authentication failed: invalid credentials")
        } else {
            bail!("qBittorrent authentication failed: status={status}, body={body}")
        }
    }

    async fn ensure_auth(&self) -> Result<()> {
        let url = self.endpoint("/api/v2/app/version");
        let response = self
            .client
            .get(&url)
            .header("Referer", &self.config.base_url)
            .send()
            .await?;

        if response.status() == StatusCode::FORBIDDEN {
            debug!(reason = "session_expired", "Logging in...");
            self.login().await?;
        }

        Ok(())
    }

    /// Hands a torrent or magnet url to qBittorrent, which fetches it itself.
    pub async fn add_torrent_url(&self, url: &str, rename: Option<&str>) -> Result<()> {
        self.ensure_auth().await?;

        let mut form: HashMap<&str, String> = HashMap::new();
        form.insert("urls", url.to_string());
        if !self.config.category.is_empty() {
            form.insert("category", self.config.category.clone());
        }
        if self.config.paused {
            form.insert("paused", "true".to_string());
        }
        if let Some(name) = rename {
            form.insert("rename", name.to_string());
        }

        let response = self
            .client
            .post(self.endpoint("/api/v2/torrents/add"))
            .header("Referer", &self.config.base_url)
            .form(&form)
            .send()
            .await
            .context("Failed to add torrent")?;

        Self::check_add_response(response).await
    }

    async fn check_add_response(response: reqwest::Response) -> Result<()> {
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::OK && !body.contains("Fails") {
            debug!("Torrent added successfully");
            Ok(())
        } else if status == StatusCode::UNSUPPORTED_MEDIA_TYPE {
            bail!("Torrent file is not valid")
        } else {
            bail!("Failed to add torrent: status={status}, body={body}")
        }
    }

    pub async fn is_available(&self) -> bool {
        let result = async {
            self.ensure_auth().await?;
            let response = self
                .client
                .get(self.endpoint("/api/v2/app/version"))
                .header("Referer", &self.config.base_url)
                .send()
                .await?
                .error_for_status()?;
            anyhow::Ok(response.text().await?)
        }
        .await;

        match result {
            Ok(version) => {
                debug!(version = %version.trim(), "qBittorrent reachable");
                true
            }
            Err(e) => {
                warn!(error = %e, "qBittorrent not available");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = QBitConfig::default();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.username, "admin");
        assert_eq!(config.password, "adminadmin");
        assert_eq!(config.category, "tv");
    }

    #[test]
    fn test_endpoint_ignores_trailing_slash() {
        let client = QBitClient::new(QBitConfig {
            base_url: "http://seedbox:8080/".to_string(),
            ..QBitConfig::default()
        })
        .unwrap();
        assert_eq!(
            client.endpoint("/api/v2/torrents/add"),
            "http://seedbox:8080/api/v2/torrents/add"
        );
    }
}
