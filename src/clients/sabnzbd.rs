use anyhow::{Context, Result, bail};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SabConfig {
    /// Base url of the SABnzbd web interface, e.g. `http://localhost:8085/sabnzbd/`.
    pub host: String,

    pub api_key: String,

    pub username: Option<String>,

    pub password: Option<String>,

    pub category: Option<String>,
}

impl Default for SabConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:8085/sabnzbd/".to_string(),
            api_key: String::new(),
            username: None,
            password: None,
            category: Some("tv".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SabPriority {
    #[default]
    Normal,
    High,
}

impl SabPriority {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "0",
            Self::High => "1",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SabClient {
    client: Client,
    config: SabConfig,
}

impl SabClient {
    pub fn new(config: SabConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::USER_AGENT)
            .build()
            .context("Failed to build SABnzbd HTTP client")?;
        Ok(Self { client, config })
    }

    fn api_url(&self, mode: &str, priority: SabPriority) -> Result<Url> {
        let base = if self.config.host.ends_with('/') {
            self.config.host.clone()
        } else {
            format!("{}/", self.config.host)
        };
        let mut url = Url::parse(&base)
            .and_then(|u| u.join("api"))
            .with_context(|| format!("Invalid SABnzbd host: {}", self.config.host))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("mode", mode);
            query.append_pair("apikey", &self.config.api_key);
            if let Some(user) = &self.config.username {
                query.append_pair("ma_username", user);
            }
            if let Some(pass) = &self.config.password {
                query.append_pair("ma_password", pass);
            }
            if let Some(cat) = &self.config.category {
                query.append_pair("cat", cat);
            }
            if priority == SabPriority::High {
                query.append_pair("priority", priority.as_str());
            }
        }

        Ok(url)
    }

    /// Asks SABnzbd to fetch an NZB from `nzb_url`.
    pub async fn add_url(&self, nzb_url: &str, name: &str, priority: SabPriority) -> Result<()> {
        let mut url = self.api_url("addurl", priority)?;
        url.query_pairs_mut()
            .append_pair("name", nzb_url)
            .append_pair("nzbname", name);

        debug!(release = %name, "Sending NZB url to SABnzbd");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Unable to connect to SABnzbd")?;

        Self::check_response(response).await
    }

    /// Uploads NZB content directly.
    pub async fn add_file(&self, name: &str, payload: Vec<u8>, priority: SabPriority) -> Result<()> {
        let url = self.api_url("addfile", priority)?;

        let part = Part::bytes(payload)
            .file_name(format!("{name}.nzb"))
            .mime_str("application/x-nzb")?;
        let form = Form::new().part("nzbfile", part);

        debug!(release = %name, "Uploading NZB to SABnzbd");

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .context("Unable to connect to SABnzbd")?;

        Self::check_response(response).await
    }

    async fn check_response(response: reqwest::Response) -> Result<()> {
        let status = response.status();
        let body = response.text().await?;
        let text = body.lines().next().unwrap_or_default().trim();

        debug!(status = %status, response = %text, "SABnzbd replied");

        match text {
            "ok" => Ok(()),
            "" => bail!("No data returned from SABnzbd, NZB not sent"),
            "Missing authentication" => {
                bail!("Incorrect username/password sent to SABnzbd, NZB not sent")
            }
            other => bail!("Unknown failure sending NZB to SABnzbd: {other}"),
        }
    }
}
