use crate::config::PluginConfig;
use crate::error::{DropWatchError, Result};
use crate::metadata::ExtractedContent;
use crate::plugins::{FilePlugin, PluginContext};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use url::Url;

const DEFAULT_PRIORITY: i64 = 3;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Publishes the file body as a push notification to an ntfy server.
///
/// Recognised headers: `topic`, `title`, `priority`.
pub struct NtfyPlugin {
    host: String,
    access_token: String,
    default_topic: Option<String>,
    default_priority: String,
    markdown: bool,
    client: reqwest::Client,
}

impl NtfyPlugin {
    pub const NAME: &'static str = "ntfy";

    pub fn from_config(config: &PluginConfig) -> Result<Self> {
        let host = config.get_str("host").ok_or_else(|| {
            DropWatchError::configuration("ntfy plugin requires `host` in [plugins.ntfy]")
        })?;
        let access_token = config.get_str("access_token").ok_or_else(|| {
            DropWatchError::configuration("ntfy plugin requires `access_token` in [plugins.ntfy]")
        })?;

        let host = host.trim_end_matches('/').to_string();
        Url::parse(&host).map_err(|e| {
            DropWatchError::configuration(format!("Invalid ntfy host '{}': {}", host, e))
        })?;

        let default_priority = config
            .settings
            .get("default_priority")
            .and_then(|value| match value {
                toml::Value::Integer(i) => Some(i.to_string()),
                toml::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                _ => None,
            })
            .unwrap_or_else(|| DEFAULT_PRIORITY.to_string());

        let timeout_secs = match config.get_integer("timeout_secs") {
            Some(secs) if secs > 0 => secs as u64,
            Some(secs) => {
                return Err(DropWatchError::configuration(format!(
                    "ntfy timeout_secs must be positive, got {}",
                    secs
                )))
            }
            None => DEFAULT_TIMEOUT_SECS,
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| {
                DropWatchError::configuration(format!("Unable to build HTTP client: {}", e))
            })?;

        Ok(Self {
            host,
            access_token: access_token.to_string(),
            default_topic: config.get_str("default_topic").map(str::to_string),
            default_priority,
            markdown: config.get_bool("markdown").unwrap_or(false),
            client,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn endpoint(&self, topic: &str) -> String {
        format!("{}/{}", self.host, topic.trim_matches('/'))
    }

    async fn deliver(&self, content: &ExtractedContent) -> anyhow::Result<String> {
        let topic = content
            .get("topic")
            .filter(|t| !t.is_empty())
            .or(self.default_topic.as_deref())
            .ok_or_else(|| anyhow!("Topic is missing."))?;
        let title = content.get("title").unwrap_or_default();
        let priority = content
            .get("priority")
            .filter(|p| !p.is_empty())
            .unwrap_or(self.default_priority.as_str());

        let mut request = self
            .client
            .post(self.endpoint(topic))
            .bearer_auth(&self.access_token)
            .header("Title", title)
            .header("Priority", priority)
            .body(content.body_or_empty().to_string());
        if self.markdown {
            request = request.header("Markdown", "yes");
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Request to {} failed", self.host))?
            .error_for_status()?;

        let text = response
            .text()
            .await
            .context("Unable to read ntfy response")?;
        let pretty = match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(json) => serde_json::to_string_pretty(&json)?,
            Err(_) => text,
        };

        Ok(format!(
            "Notification sent to ntfy server. Server returns:\n{}",
            pretty
        ))
    }
}

#[async_trait]
impl FilePlugin for NtfyPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn process(&self, ctx: &PluginContext, path: &Path) -> Result<()> {
        ctx.log(Self::NAME, &format!("Processing new file {}", path.display()))
            .await;

        let outcome = match ctx.read_metadata(path).await {
            Ok(content) => self.deliver(&content).await,
            Err(e) => Err(anyhow::Error::new(e)),
        };

        match outcome {
            Ok(note) => {
                ctx.complete(Self::NAME, path, &note).await?;
                ctx.log(
                    Self::NAME,
                    &format!("{} processed successfully.", path.display()),
                )
                .await;
            }
            Err(e) => {
                ctx.fail(
                    Self::NAME,
                    path,
                    &format!("Unable to process. Server returns: {:#}", e),
                )
                .await?;
                ctx.log(
                    Self::NAME,
                    &format!("Unable to process {}. Error: {:#}", path.display(), e),
                )
                .await;
            }
        }
        Ok(())
    }
}
