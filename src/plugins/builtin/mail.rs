use crate::config::PluginConfig;
use crate::error::{DropWatchError, Result};
use crate::metadata::ExtractedContent;
use crate::plugins::{FilePlugin, PluginContext};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Mailboxes};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde_json::json;
use std::path::Path;
use std::time::Duration;

const SECURE_PORT: u16 = 465;
const SUBMISSION_PORT: u16 = 587;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where composed messages go. Implemented by the SMTP transport.
#[async_trait]
trait Outbox: Send + Sync {
    /// Send the message and return the server's reply line.
    async fn send(&self, message: Message) -> anyhow::Result<String>;
}

#[async_trait]
impl Outbox for AsyncSmtpTransport<Tokio1Executor> {
    async fn send(&self, message: Message) -> anyhow::Result<String> {
        let response = AsyncTransport::send(self, message).await?;
        let text: Vec<String> = response.message().map(|line| line.to_string()).collect();
        Ok(format!("{} {}", response.code(), text.join(" ")))
    }
}

/// Sends the file body as an email through an SMTP relay.
///
/// Recognised headers: `to` (comma separated), `subject`, and `from` when
/// `allow_from_override` is set.
pub struct MailPlugin {
    from: Mailbox,
    html: bool,
    allow_from_override: bool,
    outbox: Box<dyn Outbox>,
}

impl MailPlugin {
    pub const NAME: &'static str = "mail";

    pub fn from_config(config: &PluginConfig) -> Result<Self> {
        let host = required(config, "host")?;
        let from = required(config, "from")?;
        let from: Mailbox = from.parse().map_err(|e| {
            DropWatchError::configuration(format!("Invalid mail `from` address '{}': {}", from, e))
        })?;

        let secure = config.get_bool("secure").unwrap_or(false);
        let default_port = if secure { SECURE_PORT } else { SUBMISSION_PORT };
        let port = match config.get_integer("port") {
            Some(port) => u16::try_from(port).ok().filter(|p| *p > 0).ok_or_else(|| {
                DropWatchError::configuration(format!("Invalid mail port {}", port))
            })?,
            None => default_port,
        };

        let timeout_secs = match config.get_integer("timeout_secs") {
            Some(secs) if secs > 0 => secs as u64,
            Some(secs) => {
                return Err(DropWatchError::configuration(format!(
                    "mail timeout_secs must be positive, got {}",
                    secs
                )))
            }
            None => DEFAULT_TIMEOUT_SECS,
        };

        let smtp_error = |e: lettre::transport::smtp::Error| {
            DropWatchError::configuration(format!("Unable to configure SMTP relay '{}': {}", host, e))
        };
        let mut builder = if secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host).map_err(smtp_error)?
        } else {
            let tls = TlsParameters::new(host.to_string()).map_err(smtp_error)?;
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
                .tls(Tls::Opportunistic(tls))
        };
        builder = builder
            .port(port)
            .timeout(Some(Duration::from_secs(timeout_secs)));

        match (config.get_str("user"), config.get_str("password")) {
            (Some(user), Some(password)) => {
                builder = builder.credentials(Credentials::new(user.to_string(), password.to_string()));
            }
            (None, None) => {}
            _ => {
                return Err(DropWatchError::configuration(
                    "mail plugin needs both `user` and `password` in [plugins.mail], or neither",
                ))
            }
        }

        Ok(Self {
            from,
            html: config.get_bool("html").unwrap_or(false),
            allow_from_override: config.get_bool("allow_from_override").unwrap_or(false),
            outbox: Box::new(builder.build()),
        })
    }

    fn sender(&self, content: &ExtractedContent) -> anyhow::Result<Mailbox> {
        match content.get("from").filter(|f| !f.is_empty()) {
            Some(from) if self.allow_from_override => from
                .parse()
                .with_context(|| format!("Invalid sender '{}'", from)),
            _ => Ok(self.from.clone()),
        }
    }

    fn compose(&self, content: &ExtractedContent) -> anyhow::Result<Message> {
        let to = content
            .get("to")
            .filter(|t| !t.is_empty())
            .ok_or_else(|| anyhow!("Recipient is missing."))?;
        let recipients: Mailboxes = to
            .parse()
            .with_context(|| format!("Invalid recipient list '{}'", to))?;

        let mut builder = Message::builder()
            .from(self.sender(content)?)
            .subject(content.get("subject").unwrap_or_default())
            .message_id(None)
            .header(if self.html {
                ContentType::TEXT_HTML
            } else {
                ContentType::TEXT_PLAIN
            });
        for recipient in recipients {
            builder = builder.to(recipient);
        }

        Ok(builder.body(content.body_or_empty().to_string())?)
    }

    async fn deliver(&self, content: &ExtractedContent) -> anyhow::Result<String> {
        let message = self.compose(content)?;

        let envelope = message.envelope();
        let recipients: Vec<String> = envelope.to().iter().map(ToString::to_string).collect();
        let sender = envelope.from().map(ToString::to_string);
        let message_id = message
            .headers()
            .get_raw("Message-ID")
            .map(str::to_string);

        let reply = self.outbox.send(message).await?;
        let summary = json!({
            "accepted": recipients,
            "envelope": { "from": sender, "to": recipients },
            "messageId": message_id,
            "response": reply,
        });

        Ok(format!(
            "Mail sent through SMTP. Server returns:\n{}",
            serde_json::to_string_pretty(&summary)?
        ))
    }
}

fn required<'a>(config: &'a PluginConfig, key: &str) -> Result<&'a str> {
    config.get_str(key).filter(|v| !v.trim().is_empty()).ok_or_else(|| {
        DropWatchError::configuration(format!("mail plugin requires `{}` in [plugins.mail]", key))
    })
}

#[async_trait]
impl FilePlugin for MailPlugin {
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
