//! Billwatch console: select a billing spreadsheet, run the remote
//! analysis, and ask follow-up questions about the result.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use services::{ApiConfig, HttpAnalysisService, HttpChatService};
use session::{FileSnapshotStore, SessionController};
use shared::types::{Role, SessionPhase};
use tracing::info;

const USAGE: &str = "usage: billwatch [<spreadsheet.(xlsx|xls|csv)>] [<area name>]";

/// Pre-filled prompts; they go through `ask` like any typed question.
const SUGGESTED_QUESTIONS: &[&str] = &[
    "Which consumers show the largest spikes?",
    "Are the flagged bills residential or commercial?",
    "What should be investigated first?",
];

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let mut args = std::env::args().skip(1);
    let file_arg = args.next();
    let area_arg = args.next();
    if file_arg.as_deref() == Some("--help") {
        println!("{USAGE}");
        return Ok(());
    }

    let config = ApiConfig::from_env();
    info!(base_url = %config.base_url, "connecting to analysis backend");

    let store = FileSnapshotStore::new();
    info!(snapshot = %store.path().display(), "session snapshot location");
    let mut session = SessionController::new(
        Arc::new(HttpAnalysisService::new(&config).context("building analysis client")?),
        Arc::new(HttpChatService::new(&config).context("building chat client")?),
        Box::new(store),
    );
    session.set_area(area_arg);

    if let Some(path) = file_arg {
        analyze_file(&mut session, &path).await?;
    } else if session.phase() == SessionPhase::Ready {
        println!("Restored previous analysis.");
        render_result(&session);
    } else {
        println!("{USAGE}");
        return Ok(());
    }

    question_loop(&mut session).await
}

async fn analyze_file(session: &mut SessionController, path: &str) -> Result<()> {
    let name = std::path::Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
        .to_string();
    let data = std::fs::read(path).with_context(|| format!("reading {path}"))?;

    if !session.select_file(&name, data) {
        anyhow::bail!(
            "{name}: {}",
            session.last_error().unwrap_or("file rejected")
        );
    }

    println!("Analyzing {name}...");
    if session.run_analysis().await {
        render_result(session);
    } else {
        anyhow::bail!(
            "analysis failed: {}",
            session.last_error().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn render_result(session: &SessionController) {
    let Some(result) = session.result() else {
        return;
    };

    println!();
    println!("=== {} ===", result.filename);
    println!(
        "{} records, {} flagged",
        result.summary.record_count(),
        result.summary.anomaly_count()
    );
    for anomaly in &result.anomalies {
        println!(
            "  [{}] {} ({}): {:.2} for {:.1} units - {}",
            match anomaly.severity {
                shared::types::Severity::High => "HIGH",
                shared::types::Severity::Low => "low ",
            },
            anomaly.identifier,
            anomaly.period,
            anomaly.bill_amount,
            anomaly.units_consumed,
            anomaly.reason,
        );
    }
    for message in session.transcript() {
        let speaker = match message.role {
            Role::User => "you",
            Role::Assistant => "billwatch",
        };
        println!();
        println!("{speaker}: {}", message.text);
    }
    println!();
}

async fn question_loop(session: &mut SessionController) -> Result<()> {
    println!("Ask a question about the analysis (\"reset\" wipes it, \"quit\" exits).");
    println!("For example:");
    for question in SUGGESTED_QUESTIONS {
        println!("  - {question}");
    }
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }
        match line.trim() {
            "quit" | "exit" => return Ok(()),
            "reset" => {
                session.reset();
                println!("Session cleared.");
                return Ok(());
            }
            question => {
                if session.ask(question).await {
                    if let Some(answer) = session.transcript().last() {
                        println!("billwatch: {}", answer.text);
                    }
                }
            }
        }
    }
}
