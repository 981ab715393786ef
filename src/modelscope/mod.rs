pub mod api;
pub mod backoff;

use crate::{
    config::{PluginConfig, Provider},
    error::{ImageGenError, Result},
    logger,
    models::{GeneratedImage, GenerationRequest, SeedSetting, TaskHandle, TaskStatus},
};
use std::sync::Arc;
use uuid::Uuid;

pub use api::ModelScopeApi;
pub use backoff::{Backoff, Sleeper, TokioSleeper};

#[derive(Clone)]
enum Backend {
    ModelScope(ModelScopeApi),
}

/// Submits text-to-image tasks and polls them until they finish.
#[derive(Clone)]
pub struct ImageGenerationClient {
    config: Arc<PluginConfig>,
    backend: Backend,
    seed: SeedSetting,
    backoff: Backoff,
    sleeper: Arc<dyn Sleeper>,
}

impl ImageGenerationClient {
    /// Fails with `Config` when the API key is missing and with
    /// `UnsupportedProvider` when the provider name is unknown.
    pub fn new(config: PluginConfig) -> Result<Self> {
        Self::with_http_client(config, reqwest::Client::new())
    }

    pub fn with_http_client(config: PluginConfig, http: reqwest::Client) -> Result<Self> {
        config.validate()?;

        let provider = config.provider()?;
        let api_key = config.api_key.as_deref().unwrap_or_default().trim().to_string();
        let seed = SeedSetting::from_config(config.seed.as_deref());

        let backend = match provider {
            Provider::ModelScope => {
                Backend::ModelScope(ModelScopeApi::new(http, config.base_url(), api_key))
            }
        };

        log::info!(
            "Image client ready: provider={}, model={}, default size={}",
            provider,
            config.model,
            config.size
        );

        Ok(Self {
            config: Arc::new(config),
            backend,
            seed,
            backoff: Backoff::default(),
            sleeper: Arc::new(TokioSleeper),
        })
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub fn seed_setting(&self) -> SeedSetting {
        self.seed
    }

    pub fn provider(&self) -> Provider {
        match self.backend {
            Backend::ModelScope(_) => Provider::ModelScope,
        }
    }

    /// Returns the URL of the generated image.
    pub async fn request_image(&self, prompt: &str, size: &str) -> Result<String> {
        self.generate(prompt, size).await.map(|image| image.url)
    }

    /// An empty `size` falls back to the configured default.
    pub async fn generate(&self, prompt: &str, size: &str) -> Result<GeneratedImage> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ImageGenError::InvalidInput("prompt must not be empty".into()));
        }

        let size = match size.trim() {
            "" => self.config.size.clone(),
            s => s.to_string(),
        };

        let seed = self.seed.resolve();
        let request = GenerationRequest {
            model: self.config.model.clone(),
            prompt: prompt.to_string(),
            seed,
            size: size.clone(),
            num_inference_steps: self.config.inference_steps().to_string(),
        };

        let request_id = Uuid::new_v4().to_string();
        let _timer = logger::timer(&format!("generate [req:{}]", request_id));
        log::info!(
            "[req:{}] Generating image: model={}, size={}, seed={}",
            request_id,
            request.model,
            request.size,
            request.seed
        );

        let (task, url) = match &self.backend {
            Backend::ModelScope(api) => {
                let task = api.submit(&request).await?;
                log::info!("[req:{}] Submitted task {}", request_id, task.task_id);
                let url = self.poll_until_done(api, &task, &request_id).await?;
                (task, url)
            }
        };

        log::info!("[req:{}] Task {} produced {}", request_id, task.task_id, url);

        Ok(GeneratedImage {
            url,
            prompt: request.prompt,
            seed,
            size,
            task_id: task.task_id,
        })
    }

    async fn poll_until_done(
        &self,
        api: &ModelScopeApi,
        task: &TaskHandle,
        request_id: &str,
    ) -> Result<String> {
        let mut delays = self.backoff.delays();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            let response = api.fetch_task(task).await?;

            match response.status() {
                TaskStatus::Succeeded => {
                    return match response.output_images.into_iter().next() {
                        Some(url) if !url.trim().is_empty() => Ok(url),
                        _ => Err(ImageGenError::EmptyResult {
                            task_id: task.task_id.clone(),
                        }),
                    };
                }
                TaskStatus::Failed => {
                    let reason = response.failure_reason();
                    log::warn!(
                        "[req:{}] Task {} failed: {}",
                        request_id,
                        task.task_id,
                        reason
                    );
                    return Err(ImageGenError::GenerationFailed {
                        task_id: task.task_id.clone(),
                        reason,
                    });
                }
                TaskStatus::Pending => {}
            }

            if let Some(max) = self.config.max_poll_attempts {
                if attempts >= max {
                    return Err(ImageGenError::PollLimitExceeded {
                        task_id: task.task_id.clone(),
                        attempts,
                    });
                }
            }

            let delay = delays.next().unwrap_or(self.backoff.max);
            log::debug!(
                "[req:{}] Task {} is {} (poll {}), retrying in {:?}",
                request_id,
                task.task_id,
                response.task_status.as_deref().unwrap_or("unknown"),
                attempts,
                delay
            );
            self.sleeper.sleep(delay).await;
        }
    }
}
