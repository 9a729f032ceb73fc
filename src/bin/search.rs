//! Command-line digest: search Reddit for a term and print summarized results.
//!
//! Runs the same search and summarization steps as the webhook without WhatsApp, which makes it
//! handy for checking Reddit credentials and the Ollama model from a terminal.
use std::fmt::Write as _;

use anyhow::{Context, Result};
use clap::Parser;
use threadbrief::{
    config, logging,
    pipeline::NOTHING_FOUND_MESSAGE,
    reddit::{ContentSearch, RedditClient, RedditSearcher},
    summarization::Summarizer,
};

#[derive(Parser)]
#[command(
    name = "threadbrief-search",
    about = "Search Reddit and print LLM digests for each result"
)]
struct Cli {
    /// Topic or question to search for.
    term: String,
    /// Maximum number of results to summarize.
    #[arg(default_value_t = 5)]
    limit: usize,
    /// Enable debug logging.
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing_with_level(if cli.verbose { "debug" } else { "warn" });

    let config = config::load_search_config().context("failed to load configuration")?;
    let searcher =
        RedditSearcher::new(RedditClient::new(&config).context("failed to build Reddit client")?);
    let summarizer = Summarizer::from_config(&config).context("failed to build summarizer")?;

    let results = searcher.search(&cli.term, cli.limit).await;
    if results.is_empty() {
        println!("{NOTHING_FOUND_MESSAGE}");
        return Ok(());
    }

    let mut rows = Vec::with_capacity(results.len());
    for result in results {
        let summary = summarizer.digest(&cli.term, &result.content).await;
        rows.push((summary, result.url));
    }
    print!("{}", render_report(&cli.term, &rows));
    Ok(())
}

fn render_report(term: &str, rows: &[(String, String)]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Resultados para: {}\n", term.trim());
    out.push_str("| Summary | Link |\n");
    out.push_str("| --- | --- |\n");
    for (summary, link) in rows {
        let _ = writeln!(out, "| {} | {} |", escape_cell(summary), escape_cell(link));
    }
    out
}

fn escape_cell(value: &str) -> String {
    value
        .trim()
        .replace('|', "\\|")
        .replace("\r\n", "<br>")
        .replace('\n', "<br>")
}
