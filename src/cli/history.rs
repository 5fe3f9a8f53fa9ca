// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 playbook-ci contributors

//! History command - inspect and clear recorded runs

use colored::Colorize;
use miette::Result;
use std::io::{self, Write};
use std::time::Duration;

use super::{HistoryAction, HistoryArgs};
use crate::history::{RunRecord, RunStore};
use crate::workflow::RunStatus;

/// Run the history command
pub async fn run(action: HistoryAction, args: &HistoryArgs, verbose: bool) -> Result<()> {
    let store = args.open()?;

    match action {
        HistoryAction::List { limit } => {
            let runs = store.list().await?;

            println!("{}", "Recorded Runs".bold());
            println!("{}", "═".repeat(72));

            if runs.is_empty() {
                println!("{}", "  No runs recorded.".dimmed());
                return Ok(());
            }

            for record in runs.iter().take(limit) {
                println!(
                    "  {} {}  {:<24} {:<12} {:<16} {:>8}  {}",
                    status_symbol(record.status),
                    record.id,
                    record.workflow,
                    record.event.kind.to_string(),
                    record.event.branch,
                    format!("{:.2}s", record.duration().as_secs_f64()),
                    age(record).dimmed()
                );
            }

            if runs.len() > limit {
                println!();
                println!(
                    "{}",
                    format!("  {} older runs not shown (use -n)", runs.len() - limit).dimmed()
                );
            }

            Ok(())
        }

        HistoryAction::Show { id } => {
            let record = store.find(&id).await?;
            print_record(&record, verbose);
            Ok(())
        }

        HistoryAction::Stats => {
            let stats = store.stats().await?;

            println!("{}", "History Statistics".bold());
            println!("{}", "═".repeat(40));
            println!("  Location:  {}", store.dir().display());
            println!("  Runs:      {}", stats.runs);
            println!("  Succeeded: {}", stats.succeeded.to_string().green());
            println!("  Failed:    {}", stats.failed.to_string().red());
            println!("  Size:      {}", stats.formatted_size());

            if let Some(oldest) = stats.oldest_run {
                if let Ok(duration) = oldest.elapsed() {
                    println!("  Oldest:    {} ago", format_duration(duration));
                }
            }

            if let Some(newest) = stats.newest_run {
                if let Ok(duration) = newest.elapsed() {
                    println!("  Newest:    {} ago", format_duration(duration));
                }
            }

            Ok(())
        }

        HistoryAction::Clear { yes } => {
            let stats = store.stats().await?;

            if stats.runs == 0 {
                println!("{}", "History is already empty.".dimmed());
                return Ok(());
            }

            if !yes {
                print!(
                    "Delete {} recorded runs ({})? [y/N] ",
                    stats.runs,
                    stats.formatted_size()
                );
                io::stdout().flush().ok();

                let mut input = String::new();
                io::stdin().read_line(&mut input).ok();

                if !input.trim().eq_ignore_ascii_case("y") {
                    println!("{}", "Cancelled.".dimmed());
                    return Ok(());
                }
            }

            store.clear().await?;
            println!("{}", "History cleared.".green());

            Ok(())
        }
    }
}

fn print_record(record: &RunRecord, verbose: bool) {
    println!("{} {}", "Run".bold(), record.id);
    println!("{}", "═".repeat(50));
    println!("  Workflow: {}", record.workflow);
    println!("  Event:    {} on '{}'", record.event.kind, record.event.branch);
    if let Some(ref commit) = record.event.commit {
        println!("  Commit:   {}", commit);
    }
    println!("  Status:   {} {}", status_symbol(record.status), record.status);
    println!("  Duration: {:.2}s", record.duration().as_secs_f64());
    println!("  Started:  {} ago", age(record));
    if verbose && !record.env_keys.is_empty() {
        println!("  Env:      {}", record.env_keys.join(", "));
    }

    println!();
    println!("{}:", "Steps".bold());

    for step in &record.steps {
        let symbol = if step.success {
            "✓".green()
        } else {
            "✗".red()
        };
        println!(
            "  {} {} [{}] exit {} ({:.2}s)",
            symbol,
            step.name.bold(),
            step.phase,
            step.exit_code,
            Duration::from_millis(step.duration_ms).as_secs_f64()
        );

        // output of passing steps only with -v
        if verbose || !step.success {
            for line in step.stdout.lines() {
                println!("    {}", line.dimmed());
            }
            for line in step.stderr.lines() {
                println!("    {}", line.red().dimmed());
            }
        }
    }
}

fn status_symbol(status: RunStatus) -> colored::ColoredString {
    match status {
        RunStatus::Succeeded => "✓".green(),
        RunStatus::Failed => "✗".red(),
    }
}

fn age(record: &RunRecord) -> String {
    record
        .started_at
        .elapsed()
        .map(format_duration)
        .unwrap_or_else(|_| "0s".to_string())
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}d", secs / 86400)
    }
}
