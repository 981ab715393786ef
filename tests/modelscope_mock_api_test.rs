//! HTTP-level tests of the submit/poll workflow against a wiremock ModelScope.

use async_trait::async_trait;
use ms_aiimg::{
    AiImgPlugin, ImageGenError, ImageGenerationClient, MessageChain, PluginConfig, Segment,
    Sleeper, ToolCallArgs,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const TASK_ID: &str = "4f0c9b3e-task";
const TASK_PATH: &str = "/v1/tasks/4f0c9b3e-task";

/// Records requested delays instead of sleeping.
#[derive(Default)]
struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    fn secs(&self) -> Vec<u64> {
        self.delays
            .lock()
            .unwrap()
            .iter()
            .map(|d| d.as_secs())
            .collect()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

fn config_for(server: &MockServer) -> PluginConfig {
    PluginConfig::new()
        .with_api_key("ms-token")
        .with_api_url(server.uri())
        .with_model("MusePublic/489_ckpt_FLUX_1")
        .with_seed("42")
}

fn client_for(config: PluginConfig) -> (ImageGenerationClient, Arc<RecordingSleeper>) {
    let sleeper = Arc::new(RecordingSleeper::default());
    let client = ImageGenerationClient::new(config)
        .unwrap()
        .with_sleeper(sleeper.clone());
    (client, sleeper)
}

async fn mount_submit_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_id": TASK_ID,
            "request_id": "req-1"
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_pending(server: &MockServer, times: u64) {
    Mock::given(method("GET"))
        .and(path(TASK_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "task_status": "RUNNING" })),
        )
        .up_to_n_times(times)
        .expect(times)
        .mount(server)
        .await;
}

async fn mount_task_result(server: &MockServer, body: serde_json::Value, expected: u64) {
    Mock::given(method("GET"))
        .and(path(TASK_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_returns_first_image_url() {
    let server = MockServer::start().await;
    mount_submit_ok(&server).await;
    mount_task_result(
        &server,
        json!({
            "task_status": "SUCCEED",
            "output_images": ["http://x/y.png", "http://x/z.png"]
        }),
        1,
    )
    .await;

    let (client, sleeper) = client_for(config_for(&server));
    let url = client.request_image("a lighthouse at dusk", "1024x1024").await.unwrap();

    assert_eq!(url, "http://x/y.png");
    assert!(sleeper.secs().is_empty());
}

#[tokio::test]
async fn test_submission_sends_expected_body_and_headers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .and(header("Authorization", "Bearer ms-token"))
        .and(header("Content-Type", "application/json"))
        .and(header("X-ModelScope-Async-Mode", "true"))
        .and(body_partial_json(json!({
            "model": "MusePublic/489_ckpt_FLUX_1",
            "prompt": "a lighthouse at dusk",
            "seed": 42,
            "size": "1024x1024",
            "num_inference_steps": "30"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "task_id": TASK_ID })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(TASK_PATH))
        .and(header("Authorization", "Bearer ms-token"))
        .and(header("X-ModelScope-Task-Type", "image_generation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_status": "SUCCEED",
            "output_images": ["http://x/y.png"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_for(config_for(&server));
    let image = client.generate("  a lighthouse at dusk ", "1024x1024").await.unwrap();

    assert_eq!(image.url, "http://x/y.png");
    assert_eq!(image.seed, 42);
    assert_eq!(image.task_id, TASK_ID);
    assert_eq!(image.prompt, "a lighthouse at dusk");
}

#[tokio::test]
async fn test_empty_size_uses_configured_default() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .and(body_partial_json(json!({ "size": "1080x1920" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "task_id": TASK_ID })))
        .expect(1)
        .mount(&server)
        .await;
    mount_task_result(
        &server,
        json!({ "task_status": "SUCCEED", "output_images": ["http://x/y.png"] }),
        1,
    )
    .await;

    let (client, _) = client_for(config_for(&server));
    let image = client.generate("forest", "").await.unwrap();
    assert_eq!(image.size, "1080x1920");
}

#[tokio::test]
async fn test_backoff_doubles_and_caps_at_ten_seconds() {
    let server = MockServer::start().await;
    mount_submit_ok(&server).await;
    mount_pending(&server, 7).await;
    mount_task_result(
        &server,
        json!({ "task_status": "SUCCEED", "output_images": ["http://x/y.png"] }),
        1,
    )
    .await;

    let (client, sleeper) = client_for(config_for(&server));
    let url = client.request_image("forest", "512x512").await.unwrap();

    assert_eq!(url, "http://x/y.png");
    assert_eq!(sleeper.secs(), vec![1, 2, 4, 8, 10, 10, 10]);
}

#[tokio::test]
async fn test_missing_task_id_is_submission_error_without_polling() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "request_id": "req-9" })))
        .expect(1)
        .mount(&server)
        .await;
    mount_task_result(&server, json!({ "task_status": "SUCCEED" }), 0).await;

    let (client, _) = client_for(config_for(&server));
    let err = client.request_image("forest", "512x512").await.unwrap_err();

    assert!(matches!(err, ImageGenError::Submission(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_succeed_without_images_is_empty_result() {
    let server = MockServer::start().await;
    mount_submit_ok(&server).await;
    mount_task_result(
        &server,
        json!({ "task_status": "SUCCEED", "output_images": [] }),
        1,
    )
    .await;

    let (client, _) = client_for(config_for(&server));
    let err = client.request_image("forest", "512x512").await.unwrap_err();

    assert!(
        matches!(&err, ImageGenError::EmptyResult { task_id } if task_id == TASK_ID),
        "got {:?}",
        err
    );
}

#[tokio::test]
async fn test_failed_status_stops_polling() {
    let server = MockServer::start().await;
    mount_submit_ok(&server).await;
    mount_pending(&server, 1).await;
    mount_task_result(
        &server,
        json!({
            "task_status": "FAILED",
            "errors": { "message": "prompt violates content policy" }
        }),
        1,
    )
    .await;

    let (client, sleeper) = client_for(config_for(&server));
    let err = client.request_image("forest", "512x512").await.unwrap_err();

    match err {
        ImageGenError::GenerationFailed { task_id, reason } => {
            assert_eq!(task_id, TASK_ID);
            assert_eq!(reason, "prompt violates content policy");
        }
        other => panic!("expected GenerationFailed, got {:?}", other),
    }
    assert_eq!(sleeper.secs(), vec![1]);
}

#[tokio::test]
async fn test_http_error_on_submit_is_network_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_for(config_for(&server));
    let err = client.request_image("forest", "512x512").await.unwrap_err();

    match err {
        ImageGenError::Network(msg) => assert!(msg.contains("401"), "message: {}", msg),
        other => panic!("expected Network, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_poll_body_is_decode_error() {
    let server = MockServer::start().await;
    mount_submit_ok(&server).await;

    Mock::given(method("GET"))
        .and(path(TASK_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_for(config_for(&server));
    let err = client.request_image("forest", "512x512").await.unwrap_err();

    assert!(matches!(err, ImageGenError::Decode(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_poll_limit_exceeded() {
    let server = MockServer::start().await;
    mount_submit_ok(&server).await;
    mount_task_result(&server, json!({ "task_status": "PENDING" }), 3).await;

    let (client, sleeper) = client_for(config_for(&server).with_max_poll_attempts(3));
    let err = client.request_image("forest", "512x512").await.unwrap_err();

    assert!(
        matches!(err, ImageGenError::PollLimitExceeded { attempts: 3, .. }),
        "got {:?}",
        err
    );
    assert_eq!(sleeper.secs(), vec![1, 2]);
}

#[tokio::test]
async fn test_empty_prompt_makes_no_requests() {
    let server = MockServer::start().await;

    let (client, _) = client_for(config_for(&server));
    let err = client.request_image("", "512x512").await.unwrap_err();

    assert!(matches!(err, ImageGenError::InvalidInput(_)));
    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_plugin_command_emits_text_then_image() {
    let server = MockServer::start().await;
    mount_submit_ok(&server).await;
    mount_task_result(
        &server,
        json!({ "task_status": "SUCCEED", "output_images": ["http://x/y.png"] }),
        1,
    )
    .await;

    let (client, _) = client_for(config_for(&server));
    let plugin = AiImgPlugin::from_client(client);
    let mut chain = MessageChain::new();

    plugin.handle_command("/aiimg a paper boat", &mut chain).await;

    assert_eq!(
        chain.segments,
        vec![
            Segment::Text("Prompt: a paper boat\nSeed: 42\nGeneration complete".into()),
            Segment::Image("http://x/y.png".into()),
        ]
    );
}

#[tokio::test]
async fn test_plugin_tool_call_reports_failure_as_text() {
    let server = MockServer::start().await;
    mount_submit_ok(&server).await;
    mount_task_result(&server, json!({ "task_status": "FAILED" }), 1).await;

    let (client, _) = client_for(config_for(&server));
    let plugin = AiImgPlugin::from_client(client);
    let mut chain = MessageChain::new();

    let args = ToolCallArgs::from_json(json!({ "prompt": "a paper boat", "size": "768x768" }))
        .unwrap();
    plugin.handle_tool_call(args, &mut chain).await;

    assert_eq!(
        chain.segments,
        vec![Segment::Text(
            "Image generation failed: task reported FAILED".into()
        )]
    );
    assert_eq!(chain.image_urls().count(), 0);
}

#[tokio::test]
async fn test_pending_with_null_images_keeps_polling() {
    let server = MockServer::start().await;
    mount_submit_ok(&server).await;

    Mock::given(method("GET"))
        .and(path(TASK_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_status": "PENDING",
            "output_images": null
        })))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_task_result(
        &server,
        json!({ "task_status": "SUCCEED", "output_images": ["http://x/y.png"] }),
        1,
    )
    .await;

    let (client, sleeper) = client_for(config_for(&server));
    let url = client.request_image("forest", "512x512").await.unwrap();

    assert_eq!(url, "http://x/y.png");
    assert_eq!(sleeper.secs(), vec![1, 2]);
}

#[tokio::test]
async fn test_succeed_with_null_images_is_empty_result() {
    let server = MockServer::start().await;
    mount_submit_ok(&server).await;
    mount_task_result(
        &server,
        json!({ "task_status": "SUCCEED", "output_images": null }),
        1,
    )
    .await;

    let (client, _) = client_for(config_for(&server));
    let err = client.request_image("forest", "512x512").await.unwrap_err();

    assert!(
        matches!(err, ImageGenError::EmptyResult { .. }),
        "got {:?}",
        err
    );
}

#[tokio::test]
async fn test_http_error_on_poll_is_network_error() {
    let server = MockServer::start().await;
    mount_submit_ok(&server).await;

    Mock::given(method("GET"))
        .and(path(TASK_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .expect(1)
        .mount(&server)
        .await;

    let (client, sleeper) = client_for(config_for(&server));
    let err = client.request_image("forest", "512x512").await.unwrap_err();

    match err {
        ImageGenError::Network(msg) => assert!(msg.contains("500"), "message: {}", msg),
        other => panic!("expected Network, got {:?}", other),
    }
    assert!(sleeper.secs().is_empty());
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let server = MockServer::start().await;
    let config = config_for(&server);
    drop(server);

    let (client, _) = client_for(config);
    let err = client.request_image("forest", "512x512").await.unwrap_err();

    assert!(matches!(err, ImageGenError::Network(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_api_key_is_trimmed_in_bearer_header() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .and(header("Authorization", "Bearer ms-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "task_id": TASK_ID })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(TASK_PATH))
        .and(header("Authorization", "Bearer ms-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_status": "SUCCEED",
            "output_images": ["http://x/y.png"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_for(config_for(&server).with_api_key(" ms-token\n"));
    let url = client.request_image("forest", "512x512").await.unwrap();

    assert_eq!(url, "http://x/y.png");
}

#[tokio::test]
async fn test_non_string_task_id_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "task_id": 123 })))
        .expect(1)
        .mount(&server)
        .await;
    mount_task_result(&server, json!({ "task_status": "SUCCEED" }), 0).await;

    let (client, _) = client_for(config_for(&server));
    let err = client.request_image("forest", "512x512").await.unwrap_err();

    assert!(matches!(err, ImageGenError::Decode(_)), "got {:?}", err);
}
