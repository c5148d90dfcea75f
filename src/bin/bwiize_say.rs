//! bwiize-say: speak text through a running bwiize-proxy.
//!
//! Reads text from the arguments (or stdin), posts it to `/api/tts` and
//! writes the returned audio to a file.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";
const HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Parser, Debug)]
#[command(name = "bwiize-say", about = "Synthesize speech via bwiize-proxy")]
struct Args {
    /// Text to speak; read from stdin when omitted
    text: Vec<String>,

    /// Proxy base URL
    #[arg(short, long, default_value = DEFAULT_SERVER)]
    server: String,

    /// Output audio file (default: speech-<timestamp>.flac)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

// --- Proxy API request/response ---

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
    code: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    let t0 = Instant::now();

    let text = if args.text.is_empty() {
        let mut input = String::new();
        if let Err(e) = std::io::stdin().read_to_string(&mut input) {
            eprintln!("Failed to read stdin: {e}");
            return ExitCode::FAILURE;
        }
        input
    } else {
        args.text.join(" ")
    };

    let Some(text) = normalize_text(&text) else {
        eprintln!("Nothing to say");
        return ExitCode::FAILURE;
    };

    let output = args.output.unwrap_or_else(default_output_path);
    let server = args.server.trim_end_matches('/');

    match speak(server, &text, &output).await {
        Ok(size) => {
            println!(
                "Wrote {size} bytes to {} ({}ms)",
                output.display(),
                t0.elapsed().as_millis()
            );
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

async fn speak(server: &str, text: &str, output: &Path) -> Result<usize, String> {
    // Short connect timeout everywhere; synthesis gets the generous total timeout
    let client = Client::builder()
        .connect_timeout(Duration::from_millis(500))
        .timeout(Duration::from_secs(90))
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {e}"))?;

    let health = client
        .get(format!("{server}/health"))
        .timeout(HEALTH_TIMEOUT)
        .send()
        .await;
    if !matches!(&health, Ok(r) if r.status().is_success()) {
        return Err(format!("bwiize-proxy is not reachable at {server}"));
    }

    let resp = client
        .post(format!("{server}/api/tts"))
        .json(&SynthesisRequest { text })
        .send()
        .await
        .map_err(|e| format!("TTS request failed: {e}"))?;

    let status = resp.status();
    if !status.is_success() {
        let detail = match resp.json::<ErrorResponse>().await {
            Ok(err) => match err.code {
                Some(code) => format!("{} ({code})", err.error),
                None => err.error,
            },
            Err(_) => "no error body".to_string(),
        };
        return Err(format!("Proxy returned {status}: {detail}"));
    }

    let audio = resp
        .bytes()
        .await
        .map_err(|e| format!("Failed to read audio: {e}"))?;
    tokio::fs::write(output, &audio)
        .await
        .map_err(|e| format!("Failed to write {}: {e}", output.display()))?;

    Ok(audio.len())
}

/// Collapse whitespace runs; `None` when nothing is left.
fn normalize_text(text: &str) -> Option<String> {
    let joined = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!joined.is_empty()).then_some(joined)
}

fn default_output_path() -> PathBuf {
    let ts = chrono::Local::now().format("%Y%m%d-%H%M%S");
    PathBuf::from(format!("speech-{ts}.flac"))
}
