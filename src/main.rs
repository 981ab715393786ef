use async_trait::async_trait;
use ms_aiimg::logger::{self, LogLevel, LoggerConfig};
use ms_aiimg::plugin::{
    AiImgPlugin, ResponseSink, ToolCallArgs, COMMAND_NAME, PLUGIN_DESCRIPTION, PLUGIN_NAME,
    PLUGIN_VERSION,
};
use ms_aiimg::PluginConfig;
use std::env;
use std::process::ExitCode;

struct StdoutSink;

#[async_trait]
impl ResponseSink for StdoutSink {
    async fn emit_text(&mut self, text: &str) {
        println!("{}", text);
    }

    async fn emit_image(&mut self, url: &str) {
        println!("[image] {}", url);
    }
}

fn usage() -> String {
    format!(
        "{} v{}: {}\n\nUsage:\n  ms-aiimg <prompt...>          run /{} <prompt>\n  ms-aiimg --tool '<json>'      run a tool call, e.g. '{{\"prompt\":\"...\",\"size\":\"1024x1024\"}}'",
        PLUGIN_NAME, PLUGIN_VERSION, PLUGIN_DESCRIPTION, COMMAND_NAME
    )
}

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv_loaded = dotenv::dotenv().is_ok();

    let level = env::var("MS_AIIMG_LOG")
        .ok()
        .and_then(|v| LogLevel::parse(&v))
        .unwrap_or(LogLevel::Info);
    if let Err(e) = logger::init_with_config(LoggerConfig::development().with_level(level)) {
        eprintln!("{}", e);
    }

    if dotenv_loaded {
        log::info!(".env file loaded");
    } else {
        log::warn!("No .env file found, using process environment only");
    }

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() || args[0] == "--help" || args[0] == "-h" {
        println!("{}", usage());
        return ExitCode::SUCCESS;
    }

    let config = PluginConfig::from_env();
    logger::log_config_info(&config);

    let plugin = match AiImgPlugin::new(config) {
        Ok(plugin) => plugin,
        Err(e) => {
            log::error!("Plugin initialisation failed: {}", e);
            eprintln!("Set MS_AIIMG_API_KEY (and optionally MS_AIIMG_MODEL, MS_AIIMG_SIZE, MS_AIIMG_SEED).");
            return ExitCode::FAILURE;
        }
    };

    let mut sink = StdoutSink;

    if args[0] == "--tool" {
        let raw = args.get(1).map(String::as_str).unwrap_or("{}");
        let parsed = serde_json::from_str(raw)
            .map_err(|e| ms_aiimg::ImageGenError::InvalidInput(e.to_string()))
            .and_then(ToolCallArgs::from_json);

        match parsed {
            Ok(tool_args) => plugin.handle_tool_call(tool_args, &mut sink).await,
            Err(e) => {
                log::error!("{}", e);
                println!("{}", usage());
                return ExitCode::FAILURE;
            }
        }
    } else {
        let message = format!("/{} {}", COMMAND_NAME, args.join(" "));
        plugin.handle_command(&message, &mut sink).await;
    }

    ExitCode::SUCCESS
}
