pub mod command;
pub mod sink;

use crate::{
    config::PluginConfig,
    error::{ImageGenError, Result},
    modelscope::ImageGenerationClient,
};

pub use command::{parse_command, ToolCallArgs, COMMAND_NAME, TOOL_NAME};
pub use sink::{MessageChain, ResponseSink, Segment};

pub const PLUGIN_NAME: &str = "ms_aiimg";
pub const PLUGIN_DESCRIPTION: &str =
    "ModelScope text-to-image. Use /aiimg <prompt> to generate an image.";
pub const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const USAGE_TEXT: &str = "Please provide a prompt! Usage: /aiimg <prompt>";

/// Command and tool handlers a chat host wires to `/aiimg` and its tool registry.
#[derive(Clone)]
pub struct AiImgPlugin {
    client: ImageGenerationClient,
}

impl AiImgPlugin {
    pub fn new(config: PluginConfig) -> Result<Self> {
        Ok(Self::from_client(ImageGenerationClient::new(config)?))
    }

    pub fn from_client(client: ImageGenerationClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ImageGenerationClient {
        &self.client
    }

    pub async fn handle_command(&self, message: &str, sink: &mut dyn ResponseSink) {
        match parse_command(message) {
            Some(prompt) => self.run(&prompt, "", sink).await,
            None => sink.emit_text(USAGE_TEXT).await,
        }
    }

    pub async fn handle_tool_call(&self, args: ToolCallArgs, sink: &mut dyn ResponseSink) {
        let size = args.size.unwrap_or_default();
        self.run(&args.prompt, &size, sink).await
    }

    async fn run(&self, prompt: &str, size: &str, sink: &mut dyn ResponseSink) {
        match self.client.generate(prompt, size).await {
            Ok(image) => {
                sink.emit_text(&format!(
                    "Prompt: {}\nSeed: {}\nGeneration complete",
                    image.prompt, image.seed
                ))
                .await;
                sink.emit_image(&image.url).await;
            }
            Err(err) if err.is_remote() => {
                log::warn!("Image generation for {:?} rejected: {}", prompt, err);
                sink.emit_text(&failure_message(&err)).await;
            }
            Err(err) => {
                log::error!("Image generation for {:?} failed: {}", prompt, err);
                sink.emit_text(&failure_message(&err)).await;
            }
        }
    }
}

pub fn failure_message(err: &ImageGenError) -> String {
    match err {
        ImageGenError::InvalidInput(_) => USAGE_TEXT.to_string(),
        ImageGenError::GenerationFailed { .. } => err.to_string(),
        other => format!("Failed to generate image: {}", other),
    }
}
