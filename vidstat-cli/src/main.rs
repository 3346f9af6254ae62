//! vidstat-cli — ask analytics questions against a running vidstat server
//!
//! # Subcommands
//! - `ask <question> [--json]` — answer one natural-language question
//! - `status`                  — show server health

use clap::{Parser, Subcommand};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8780";

#[derive(Debug, Parser)]
#[command(
    name = "vidstat-cli",
    version,
    about = "Ask video analytics questions in plain language"
)]
struct Cli {
    /// vidstat HTTP server URL (overrides VIDSTAT_HTTP_URL env var)
    #[arg(long, env = "VIDSTAT_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Answer a question, e.g. "Сколько всего видео есть в системе?"
    Ask {
        /// Question words; joined with spaces
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Show vidstat server status
    Status,
}

/// Response body of POST /ask
#[derive(Debug, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub status: String,
    pub took_ms: Option<u64>,
}

impl AskResponse {
    pub fn is_answered(&self) -> bool {
        self.status == "ok"
    }
}

/// Exit code for an answer: 0 for a number, 2 for a pipeline failure.
pub fn exit_code(resp: &AskResponse) -> i32 {
    if resp.is_answered() {
        0
    } else {
        2
    }
}

fn do_ask(server: &str, question: &str, json_output: bool) -> anyhow::Result<i32> {
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(90))
        .build()?;

    let url = format!("{}/ask", server);
    let resp = match client
        .post(&url)
        .json(&serde_json::json!({ "question": question }))
        .send()
    {
        Ok(r) => r,
        Err(e) => {
            eprintln!("vidstat-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        eprintln!("vidstat-cli: server returned {}: {}", status, body);
        std::process::exit(1);
    }

    let text = resp.text()?;
    let answer: AskResponse = match serde_json::from_str(&text) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("vidstat-cli: failed to parse answer: {}", e);
            std::process::exit(1);
        }
    };

    if json_output {
        println!("{}", text);
    } else {
        println!("{}", answer.answer);
    }

    Ok(exit_code(&answer))
}

fn do_status(server: &str) -> anyhow::Result<i32> {
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()?;

    let url = format!("{}/health", server);
    match client.get(&url).send() {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("vidstat server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:        {}", body["version"].as_str().unwrap_or("?"));
            println!("PostgreSQL:     {}", body["postgresql"].as_str().unwrap_or("?"));
            if let Some(missing) = body["missing_tables"].as_array().filter(|m| !m.is_empty()) {
                let names: Vec<&str> = missing.iter().filter_map(|m| m.as_str()).collect();
                println!("Missing tables: {}", names.join(", "));
            }
        }
        Ok(r) => {
            eprintln!("vidstat-cli: server unhealthy (HTTP {})", r.status());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("vidstat-cli: cannot reach {}: {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(0)
}

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Ask { question, json } => do_ask(&server, &question.join(" "), json),
        Commands::Status => do_status(&server),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("vidstat-cli: {}", e);
            std::process::exit(1);
        }
    }
}
