#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use args::Args;
use clap::Parser;
use futures_util::StreamExt;
use prompti_config::Config;
use prompti_llm::{EventStream, ModelClient, RetryPolicy, StreamEvent};
use prompti_telemetry::OtelMetrics;
use url::Url;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let config = load_config(&args.config).await?;

    let _telemetry_guard = prompti_telemetry::init(config.telemetry.as_ref(), &args.log)?;

    let request = args.request();
    tracing::info!(
        provider = %config.model.provider,
        model = %config.model.model,
        stream = request.stream,
        "running prompt"
    );

    let retry = RetryPolicy::try_from(&config.retry)?;
    let mut client = ModelClient::new(config.model, Arc::new(OtelMetrics::new()))?.with_retry_policy(retry);

    let stream = client.run(&request)?;

    let succeeded = tokio::select! {
        result = print_events(stream) => result?,
        () = shutdown_signal() => {
            tracing::info!("interrupted, abandoning call");
            false
        }
    };

    client.close();

    Ok(if succeeded { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Local path, or a remote JSON document when given an http(s) URL
async fn load_config(location: &str) -> anyhow::Result<Config> {
    if location.starts_with("http://") || location.starts_with("https://") {
        let url = Url::parse(location)?;
        return Config::fetch(&url).await;
    }

    Config::load(std::path::Path::new(location))
}

/// Print the answer; returns false if the vendor reported an error
async fn print_events(mut stream: EventStream) -> anyhow::Result<bool> {
    let mut stdout = std::io::stdout();
    let mut succeeded = true;

    while let Some(event) = stream.next().await {
        match event? {
            StreamEvent::Text(text) => {
                write!(stdout, "{text}")?;
                stdout.flush()?;
            }
            StreamEvent::Thinking(text) => eprint!("{text}"),
            StreamEvent::ToolUse(call) => writeln!(stdout, "{}", serde_json::to_string(&call)?)?,
            StreamEvent::Error(error) => {
                eprintln!("vendor error (HTTP {}): {}", error.status, error.body);
                succeeded = false;
            }
            StreamEvent::Reset { attempt } => {
                tracing::warn!(attempt, "transport failed mid-answer, output restarts");
                writeln!(stdout)?;
            }
        }
    }

    writeln!(stdout)?;
    Ok(succeeded)
}

/// Wait for a shutdown signal (`SIGINT` or `SIGTERM`)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
