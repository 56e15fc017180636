use crate::config::PluginConfig;
use crate::error::Result;
use crate::plugins::{FilePlugin, PluginContext};
use async_trait::async_trait;
use std::path::Path;

/// Reads a `user`/`title` header and logs a line about it.
///
/// Mostly useful as a template for new plugins and for checking that a
/// folder is wired up.
#[derive(Debug, Clone, Default)]
pub struct ExamplePlugin {
    completion_note: String,
}

impl ExamplePlugin {
    pub const NAME: &'static str = "example";

    pub fn new<S: Into<String>>(completion_note: S) -> Self {
        Self {
            completion_note: completion_note.into(),
        }
    }

    pub fn from_config(config: &PluginConfig) -> Self {
        Self::new(config.get_str("completion_note").unwrap_or_default())
    }

    async fn describe(&self, ctx: &PluginContext, path: &Path) -> Result<()> {
        let content = ctx.read_metadata(path).await?;
        let user = content.require(Self::NAME, "user")?;
        let title = content.require(Self::NAME, "title")?;

        ctx.log(
            Self::NAME,
            &format!(
                "The title of {} is {}. Note is: {}",
                user,
                title,
                content.body_or_empty()
            ),
        )
        .await;
        Ok(())
    }
}

#[async_trait]
impl FilePlugin for ExamplePlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn process(&self, ctx: &PluginContext, path: &Path) -> Result<()> {
        ctx.log(Self::NAME, &format!("Processing {}.", path.display()))
            .await;

        match self.describe(ctx, path).await {
            Ok(()) => {
                ctx.complete(Self::NAME, path, &self.completion_note).await?;
                ctx.log(
                    Self::NAME,
                    &format!("{} processed successfully.", path.display()),
                )
                .await;
            }
            Err(e) => {
                ctx.fail(Self::NAME, path, &format!("Unable to process. {}", e))
                    .await?;
                ctx.log(
                    Self::NAME,
                    &format!("Unable to process {}. Error: {}", path.display(), e),
                )
                .await;
            }
        }
        Ok(())
    }
}
