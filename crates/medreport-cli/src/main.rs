mod inputs;
mod render;
mod session;
mod settings;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use cliclack::{confirm, input};
use console::style;
use medreport::client::AnalysisClient;
use medreport::errors::AnalysisError;
use medreport::lifecycle::{AnalysisLifecycle, TurnEvent};
use medreport::models::turn::TurnEntry;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::inputs::load_payload;
use crate::render::EventRenderer;
use crate::session::{ensure_session_dir, persist_transcript, prune_sessions};
use crate::settings::Settings;

/// Sessions kept on disk; older ones are pruned after each save.
const SESSION_KEEP: usize = 50;

#[derive(Parser)]
#[command(author, version, about = "Medical report analysis client", long_about = None)]
struct Cli {
    /// Path to a prepared report image; prompts interactively when omitted
    image: Option<PathBuf>,

    /// Analysis server URL (overrides MEDREPORT_SERVER__URL)
    #[arg(short, long)]
    server: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let settings = Settings::new()?;
    let server = cli.server.unwrap_or(settings.server.url);
    tracing::debug!(%server, timeout_secs = settings.server.timeout_secs, "resolved settings");
    let client =
        AnalysisClient::with_timeout(&server, Duration::from_secs(settings.server.timeout_secs))?;
    let (mut lifecycle, mut events) = AnalysisLifecycle::new(client);

    println!(
        "medreport {}",
        style("- submit a report image, type \"exit\" to end the session").dim()
    );
    println!();

    let session_dir = ensure_session_dir()?;
    let session_file = session_dir.join(format!("{}.jsonl", Uuid::new_v4()));
    let mut entries: Vec<TurnEntry> = Vec::new();
    let mut next_image = cli.image;

    loop {
        let path = match next_image.take() {
            Some(path) => path,
            None => {
                let answer: String = input("Report image path:").placeholder("").interact()?;
                if answer.trim().eq_ignore_ascii_case("exit") {
                    break;
                }
                PathBuf::from(answer.trim())
            }
        };

        let payload = match load_payload(&path) {
            Ok(payload) => payload,
            Err(e) => {
                println!("{}", style(format!("{e:#}")).red());
                continue;
            }
        };

        lifecycle.submit(payload)?;
        loop {
            match drive_turn(&mut events).await {
                Ok(processing_time) => {
                    if let Some(secs) = processing_time {
                        println!("{}", style(format!("processed in {secs:.1}s")).dim());
                    }
                    break;
                }
                Err(error) => {
                    println!("{}", style(&error).red());
                    if confirm("Retry with the same image?").interact()? {
                        lifecycle.retry()?;
                    } else {
                        break;
                    }
                }
            }
        }

        entries.extend(lifecycle.take_transcript());
        persist_transcript(&session_file, &entries)?;
        prune_sessions(&session_dir, SESSION_KEEP)?;
        println!();
    }

    Ok(())
}

/// Render events until the turn reaches a terminal state.
async fn drive_turn(
    events: &mut mpsc::UnboundedReceiver<TurnEvent>,
) -> Result<Option<f64>, AnalysisError> {
    let mut renderer = EventRenderer::new();
    while let Some(event) = events.recv().await {
        renderer.handle(&event);
        match event {
            TurnEvent::Succeeded { processing_time } => return Ok(processing_time),
            TurnEvent::Failed { error } => return Err(error),
            _ => {}
        }
    }
    Err(AnalysisError::Network("event channel closed".to_string()))
}
