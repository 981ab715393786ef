use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    pub task_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Succeeded,
    Failed,
}

impl TaskStatus {
    /// Anything other than `SUCCEED` or `FAILED` is still running.
    pub fn from_api(status: Option<&str>) -> Self {
        match status {
            Some("SUCCEED") => TaskStatus::Succeeded,
            Some("FAILED") => TaskStatus::Failed,
            _ => TaskStatus::Pending,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    pub task_id: Option<String>,
    pub request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TaskResponse {
    pub task_status: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub output_images: Vec<String>,
    pub errors: Option<serde_json::Value>,
}

impl TaskResponse {
    pub fn status(&self) -> TaskStatus {
        TaskStatus::from_api(self.task_status.as_deref())
    }

    /// Best-effort failure message from the `errors` payload.
    pub fn failure_reason(&self) -> String {
        let message = match &self.errors {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Object(map)) => map
                .get("message")
                .and_then(|m| m.as_str())
                .map(String::from),
            _ => None,
        };

        message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "task reported FAILED".to_string())
    }
}

/// The API sends `"output_images": null` while a task is still running.
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
