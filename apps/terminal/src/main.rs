use std::{io::Write, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use session_core::{ChatSession, HttpResponder, RejectReason, SubmitOutcome, Transcript};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Parser, Debug)]
struct Args {
    /// Base URL of the chat API; requests go to `{api_url}/chat`.
    #[arg(long, env = "CHAT_API_URL", default_value = "http://127.0.0.1:8000/api")]
    api_url: String,
    /// Transport timeout for each exchange.
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let responder =
        HttpResponder::with_timeout(&args.api_url, Duration::from_secs(args.timeout_secs))
            .context("failed to build http client")?;
    let session = ChatSession::new(responder);

    let mut shown = print_new(&session.transcript(), 0)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim() == "/quit" {
            break;
        }

        session.set_draft(line);
        match session.submit_draft().await {
            SubmitOutcome::Rejected(RejectReason::EmptyInput) => continue,
            SubmitOutcome::Rejected(reason) => {
                debug!(?reason, "submit ignored");
                continue;
            }
            SubmitOutcome::Replied | SubmitOutcome::FellBack => {}
        }
        shown = print_new(&session.transcript(), shown)?;
    }

    Ok(())
}

fn print_new(transcript: &Transcript, already_shown: usize) -> Result<usize> {
    let mut stdout = std::io::stdout().lock();
    for entry in transcript.iter().skip(already_shown) {
        writeln!(stdout, "{}", render::format_entry(entry))?;
    }
    Ok(transcript.len())
}
