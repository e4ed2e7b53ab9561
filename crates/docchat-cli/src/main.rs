//! docchat - chat with a backend agent about an uploaded document.

mod commands;
mod render;

use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use docchat_core::client::HealthStatus;
use docchat_core::config::ENV_DATA_DIR;
use docchat_core::{
    ChatCoordinator, ClientConfig, FileStore, HttpQueryClient, HttpUploadClient, MemoryStore,
    SendRejected, UploadClient,
};
use tokio::io::{AsyncBufReadExt, BufReader};

use commands::{Command, HELP};
use render::{Renderer, UPLOAD_HINT};

#[derive(Parser, Debug)]
#[command(name = "docchat", version, about = "Chat with a backend agent about a document")]
struct Args {
    /// Backend root URL (default http://localhost:9000)
    #[arg(long)]
    base_url: Option<String>,

    /// Directory for chat history and config.json (default ~/.docchat)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Write request/response wire logs to this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Keep history in memory only
    #[arg(long)]
    ephemeral: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn resolve_config(&self) -> Result<ClientConfig, docchat_core::config::ConfigError> {
        let data_dir_flag = self.data_dir.as_ref().map(|dir| dir.display().to_string());
        let mut config = ClientConfig::load_with(|name| {
            if name == ENV_DATA_DIR && data_dir_flag.is_some() {
                return data_dir_flag.clone();
            }
            std::env::var(name).ok()
        })?;

        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(dir) = &self.log_dir {
            config.log_dir = Some(dir.clone());
        }
        if let Some(secs) = self.timeout_secs.filter(|secs| *secs > 0) {
            config.request_timeout_secs = secs;
        }
        Ok(config)
    }
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

/// Await `work`, or give up with `None` once `interrupted` fires.
async fn unless_interrupted<T, I>(work: impl Future<Output = T>, interrupted: &mut I) -> Option<T>
where
    I: Future + Unpin,
{
    tokio::select! {
        value = work => Some(value),
        _ = interrupted => None,
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

/// How long shutdown waits for blocking requests still in flight.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run(args));
    // A query or upload cannot be cancelled; don't wait out its timeout.
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.resolve_config()?;
    log::debug!("Using backend {}", config.base_url);

    let query_client = Arc::new(HttpQueryClient::new(&config));
    let upload_client = Arc::new(HttpUploadClient::new(&config));

    let builder = ChatCoordinator::builder(query_client.clone());
    let coordinator = if args.ephemeral {
        builder.store(MemoryStore::new())
    } else {
        builder.store(FileStore::new(config.resolved_data_dir()?))
    }
    .build();

    let mut renderer = Renderer::new(
        coordinator.subscribe(),
        std::io::stdout(),
        *chrono::Local::now().offset(),
    );
    let restored = coordinator.messages();
    if !restored.is_empty() {
        renderer.transcript(&restored)?;
    }
    renderer.line(UPLOAD_HINT)?;
    renderer.line("Type /help for commands.")?;

    // Installing the handler replaces the default SIGINT exit, so every
    // await below must also watch it.
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt();
        let line = match unless_interrupted(lines.next_line(), &mut interrupted).await {
            Some(line) => line?,
            None => None,
        };
        let Some(line) = line else { break };

        match commands::parse(&line) {
            Command::Quit => break,
            Command::Help => renderer.line(HELP)?,
            Command::New => coordinator.new_chat(),
            Command::Clear => coordinator.clear_chat(),
            Command::History => renderer.transcript(&coordinator.messages())?,
            Command::Invalid(reason) => renderer.line(&reason)?,
            Command::Health => {
                let client = Arc::clone(&query_client);
                let health = tokio::task::spawn_blocking(move || client.health());
                let Some(status) = unless_interrupted(health, &mut interrupted).await else {
                    break;
                };
                let status = status?;
                match status {
                    Ok(HealthStatus::Ready) => renderer.line("Backend is ready.")?,
                    Ok(HealthStatus::InitializingOrFailed) => {
                        renderer.line("Backend is still initializing (or failed to start).")?
                    }
                    Err(e) => renderer.line(&format!("Backend unreachable: {e}"))?,
                }
            }
            Command::Upload(path) => {
                renderer.line("Uploading...")?;
                let client = Arc::clone(&upload_client);
                let upload = tokio::task::spawn_blocking(move || client.upload(&path));
                let Some(result) = unless_interrupted(upload, &mut interrupted).await else {
                    break;
                };
                let result = result?;
                match result {
                    Ok(response) => coordinator.complete_upload(&response.filename),
                    Err(e) => {
                        log::warn!("Upload failed: {}", e);
                        renderer.line(&format!("Failed to upload file. Please try again. ({e})"))?;
                    }
                }
            }
            Command::Say(text) => match coordinator.send(&text) {
                Ok(handle) => {
                    renderer.drain()?;
                    if unless_interrupted(handle.wait(), &mut interrupted).await.is_none() {
                        break;
                    }
                }
                Err(SendRejected::EmptyText) => {}
                Err(rejected) => renderer.line(&rejected.to_string())?,
            },
        }
        renderer.drain()?;
    }

    log::debug!("Exiting");
    Ok(())
}
