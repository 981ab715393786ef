use crate::error::{ImageGenError, Result};
use serde::Deserialize;
use serde_json::json;

pub const COMMAND_NAME: &str = "aiimg";
pub const TOOL_NAME: &str = "generate_image";

/// Prompt from a `/aiimg <prompt>` message: everything after the first space, trimmed.
pub fn parse_command(message: &str) -> Option<String> {
    let (_, rest) = message.split_once(' ')?;
    let prompt = rest.trim();
    if prompt.is_empty() {
        None
    } else {
        Some(prompt.to_string())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ToolCallArgs {
    pub prompt: String,
    #[serde(default)]
    pub size: Option<String>,
}

impl ToolCallArgs {
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| ImageGenError::InvalidInput(format!("bad tool arguments: {}", e)))
    }

    /// Function-calling definition a host can register for LLM tool use.
    pub fn definition() -> serde_json::Value {
        json!({
            "name": TOOL_NAME,
            "description": "Generate an image from a text prompt and return it to the chat.",
            "parameters": {
                "type": "object",
                "properties": {
                    "prompt": {
                        "type": "string",
                        "description": "Description of the image to generate"
                    },
                    "size": {
                        "type": "string",
                        "description": "Image size as WIDTHxHEIGHT, e.g. 1080x1920"
                    }
                },
                "required": ["prompt"]
            }
        })
    }
}
