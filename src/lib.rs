//! Chat-bot plugin core for ModelScope text-to-image generation.
//!
//! A prompt goes in, an async generation task is submitted, its status is
//! polled with capped exponential backoff, and the image URL comes back.
//! The host chat framework is reached only through [`plugin::ResponseSink`].

pub mod config;
pub mod error;
pub mod logger;
pub mod modelscope;
pub mod models;
pub mod plugin;

pub use config::{PluginConfig, Provider};
pub use error::{ImageGenError, Result};
pub use modelscope::{Backoff, ImageGenerationClient, Sleeper, TokioSleeper};
pub use models::{GeneratedImage, GenerationRequest, SeedSetting, TaskHandle, TaskStatus};
pub use plugin::{AiImgPlugin, MessageChain, ResponseSink, Segment, ToolCallArgs};
