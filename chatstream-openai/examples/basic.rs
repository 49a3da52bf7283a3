//! Stream a completion to stdout.
//!
//! Set OPENAI_API_KEY in your environment and run:
//!   cargo run --example basic -- "Write a haiku about rivers"
//!
//! `RUST_LOG=chatstream_openai=debug` shows the stream lifecycle.

use std::io::Write;

use chatstream_openai::OpenAi;
use chatstream_types::{StreamEvent, TerminalSignal};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let prompt = if args.is_empty() {
        "Say hello in one sentence.".to_string()
    } else {
        args.join(" ")
    };

    let client = OpenAi::from_env()?;
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let session = client.session(tx);
    session.start(&prompt);

    let mut stdout = std::io::stdout();
    while let Some(event) = rx.recv().await {
        match event {
            StreamEvent::Terminal(TerminalSignal::Completed) => break,
            StreamEvent::Terminal(TerminalSignal::Cancelled) => {
                eprintln!("\nstream cancelled");
                break;
            }
            StreamEvent::Terminal(TerminalSignal::Failed(err)) => {
                eprintln!("\nstream failed: {err}");
                break;
            }
            other => {
                if let Some(text) = other.text() {
                    write!(stdout, "{text}")?;
                    stdout.flush()?;
                }
            }
        }
    }

    Ok(())
}
