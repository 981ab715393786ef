use crate::{
    error::{ImageGenError, Result},
    models::{GenerationRequest, SubmitResponse, TaskHandle, TaskResponse},
};
use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;

const ASYNC_MODE_HEADER: &str = "X-ModelScope-Async-Mode";
const TASK_TYPE_HEADER: &str = "X-ModelScope-Task-Type";
const TASK_TYPE_IMAGE: &str = "image_generation";

/// Thin HTTP layer over the two ModelScope endpoints used for async generation.
#[derive(Clone)]
pub struct ModelScopeApi {
    http: Client,
    base_url: String,
    api_key: String,
}

impl ModelScopeApi {
    pub fn new(http: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub async fn submit(&self, request: &GenerationRequest) -> Result<TaskHandle> {
        let url = format!("{}v1/images/generations", self.base_url);
        log::debug!("Submitting generation task to {}", url);

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, self.bearer())
            .header(header::CONTENT_TYPE, "application/json")
            .header(ASYNC_MODE_HEADER, "true")
            .json(request)
            .send()
            .await
            .map_err(|e| ImageGenError::Network(format!("submit request failed: {}", e)))?;

        let body: SubmitResponse = read_json(response).await?;

        match body.task_id.filter(|id| !id.trim().is_empty()) {
            Some(task_id) => Ok(TaskHandle { task_id }),
            None => Err(ImageGenError::Submission(format!(
                "response has no task_id (request_id: {})",
                body.request_id.as_deref().unwrap_or("none")
            ))),
        }
    }

    pub async fn fetch_task(&self, task: &TaskHandle) -> Result<TaskResponse> {
        let url = format!("{}v1/tasks/{}", self.base_url, task.task_id);

        let response = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, self.bearer())
            .header(header::CONTENT_TYPE, "application/json")
            .header(TASK_TYPE_HEADER, TASK_TYPE_IMAGE)
            .send()
            .await
            .map_err(|e| ImageGenError::Network(format!("task status request failed: {}", e)))?;

        read_json(response).await
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}

/// Non-2xx statuses become `Network`; bodies that are not the expected JSON become `Decode`.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ImageGenError::Network(format!("failed to read response body: {}", e)))?;

    if !status.is_success() {
        log::error!("ModelScope returned HTTP {}: {}", status, body);
        return Err(ImageGenError::Network(format!("HTTP {}: {}", status, body)));
    }

    serde_json::from_str(&body).map_err(|e| {
        log::error!("Malformed response body: {}", body);
        ImageGenError::from(e)
    })
}
