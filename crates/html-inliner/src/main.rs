use anyhow::Result;
use clap::Parser;
use html_inliner::fetch::{parse_duration, parse_size};
use html_inliner::{FetchOptions, Inliner};
use html_inliner_common::{content_hash, write_ndjson, Event};
use std::io::Write;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "html-inliner", about = "Pack an HTML page and its resources into one file")]
struct Opt {
    /// URL, file path, or raw HTML text
    input: String,
    /// Directory or URL used to resolve relative references
    #[arg(long)]
    base_path: Option<String>,
    /// Write the document here and print an NDJSON event instead
    #[arg(long)]
    out: Option<String>,
    /// Per-request timeout (e.g., 15s)
    #[arg(long, default_value = "15s")]
    timeout: String,
    /// Max bytes per fetched resource (e.g., 25MB)
    #[arg(long, default_value = "25MB")]
    max_bytes: String,
    /// User-Agent header for HTTP requests
    #[arg(long, default_value = "html-inliner/0.1")]
    user_agent: String,
    /// Log every inlined and skipped reference to stderr
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<ExitCode> {
    let opt = Opt::parse();

    let default_level = if opt.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    // Parse options
    let fetch_opts = FetchOptions {
        timeout: parse_duration(&opt.timeout)?,
        max_bytes: parse_size(&opt.max_bytes)?,
        user_agent: opt.user_agent.clone(),
    };
    let inliner = Inliner::with_options(fetch_opts)?;

    let html = match inliner.try_process(&opt.input, opt.base_path.as_deref()) {
        Ok(html) => html,
        Err(e) => {
            write_ndjson(&Event::Error {
                code: "E_INLINE".to_string(),
                message: format!("{:#}", anyhow::Error::new(e)),
                path_or_url: Some(display_input(&opt.input)),
            })?;
            return Ok(ExitCode::FAILURE);
        }
    };

    match opt.out {
        Some(out) => {
            std::fs::write(&out, &html)?;
            write_ndjson(&Event::Inlined {
                input: display_input(&opt.input),
                output: out,
                bytes: html.len() as u64,
                hash: content_hash(html.as_bytes()),
            })?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(html.as_bytes())?;
            stdout.flush()?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Raw markup is reported by its first line only.
fn display_input(input: &str) -> String {
    let first = input.lines().next().unwrap_or_default();
    if first.len() < input.len() || first.len() > 200 {
        let cut = first
            .char_indices()
            .nth(200)
            .map(|(i, _)| i)
            .unwrap_or(first.len());
        format!("{}…", &first[..cut])
    } else {
        first.to_string()
    }
}
