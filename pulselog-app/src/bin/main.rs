use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use dotenv::dotenv;
use tracing::{info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use pulselog_app::HealthTracker;
use pulselog_data::{FileBackend, StoreAdapter};
use pulselog_domain::{exceeds_thresholds, CreateRecordRequest, Thresholds};

/// The entry point for the PulseLog demo binary
///
/// This binary:
/// 1. Initializes environment variables from a .env file
/// 2. Sets up tracing for logging
/// 3. Opens the store document under DATA_DIR (or the platform data dir)
/// 4. Drives the tracker facade from simple subcommands
fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    if dotenv().is_err() {
        eprintln!("Warning: .env file not found or couldn't be read. Using environment variables.");
    }

    // Initialize tracing for structured logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_span_events(FmtSpan::CLOSE)
                .with_target(false)
                .with_ansi(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stderr),
        )
        .with(env_filter)
        .init();

    let store_path = resolve_data_dir().join("pulselog_store.json");

    // A missing or unwritable store degrades to session-only state rather
    // than failing startup
    let adapter = match FileBackend::open(&store_path) {
        Ok(backend) => {
            info!("Using store document at {}", store_path.display());
            StoreAdapter::new(Arc::new(backend))
        }
        Err(e) => {
            warn!(
                "Durable store unavailable ({}), readings will not be persisted",
                e
            );
            StoreAdapter::detached()
        }
    };

    let tracker = HealthTracker::new(adapter);
    tracker.hydrate();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("add") => cmd_add(&tracker, &args[1..]),
        Some("list") => cmd_list(&tracker, &args[1..]),
        Some("delete") => cmd_delete(&tracker, &args[1..]),
        Some("thresholds") => cmd_thresholds(&tracker, &args[1..]),
        Some("summary") => cmd_summary(&tracker),
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_local_dir()
        .map(|dir| dir.join("pulselog"))
        .unwrap_or_else(|| PathBuf::from("data"))
}

fn print_usage() {
    println!("Usage: pulselog <command>");
    println!();
    println!("Commands:");
    println!("  add <systolic> <diastolic> [heart-rate]   Save a new reading");
    println!("  list [--from YYYY-MM-DD] [--to YYYY-MM-DD] [--over-threshold]");
    println!("  delete <id>                               Delete a reading by id");
    println!("  thresholds [<systolic> <diastolic> <heart-rate>]");
    println!("  summary                                   Aggregate statistics");
}

fn parse_measure(value: &str, label: &str) -> anyhow::Result<u16> {
    value
        .parse::<u16>()
        .with_context(|| format!("{} must be a number, got \"{}\"", label, value))
}

fn parse_day(value: &str, label: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("{} must be a YYYY-MM-DD date, got \"{}\"", label, value))
}

fn cmd_add(tracker: &HealthTracker, args: &[String]) -> anyhow::Result<()> {
    let (systolic, diastolic) = match args {
        [systolic, diastolic, ..] => (
            parse_measure(systolic, "systolic")?,
            parse_measure(diastolic, "diastolic")?,
        ),
        _ => bail!("add needs at least <systolic> and <diastolic>"),
    };
    let heart_rate = match args.get(2) {
        Some(value) => Some(parse_measure(value, "heart rate")?),
        None => None,
    };

    let record = tracker.save_record(CreateRecordRequest {
        systolic,
        diastolic,
        heart_rate,
        timestamp: None,
    })?;

    println!("Saved reading {} ({}/{})", record.id, record.systolic, record.diastolic);
    if !tracker.is_persistent() {
        println!("Note: no durable store available, this reading is session-only");
    }
    Ok(())
}

fn cmd_list(tracker: &HealthTracker, args: &[String]) -> anyhow::Result<()> {
    let mut args = args.iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--from" => {
                let value = args.next().context("--from needs a date")?;
                tracker.set_start_time(Some(parse_day(value, "--from")?));
            }
            "--to" => {
                let value = args.next().context("--to needs a date")?;
                tracker.set_end_time(Some(parse_day(value, "--to")?));
            }
            "--over-threshold" => tracker.set_filter_enabled(true),
            other => bail!("unknown list option \"{}\"", other),
        }
    }

    let thresholds = tracker.thresholds();
    let visible = tracker.visible_records();
    if visible.is_empty() {
        println!("No readings");
        return Ok(());
    }

    for record in &visible {
        let heart_rate = record
            .heart_rate
            .map(|hr| format!(", {} bpm", hr))
            .unwrap_or_default();
        let marker = if exceeds_thresholds(record, &thresholds) {
            "  [high]"
        } else {
            ""
        };
        println!(
            "{}  {}/{} mmHg{}{}  ({})",
            record.timestamp, record.systolic, record.diastolic, heart_rate, marker, record.id
        );
    }
    Ok(())
}

fn cmd_delete(tracker: &HealthTracker, args: &[String]) -> anyhow::Result<()> {
    let id = args.first().context("delete needs a record id")?;
    if tracker.delete_record(id) {
        println!("Deleted reading {}", id);
    } else {
        println!("No reading with id {}", id);
    }
    Ok(())
}

fn cmd_thresholds(tracker: &HealthTracker, args: &[String]) -> anyhow::Result<()> {
    if args.is_empty() {
        let thresholds = tracker.thresholds();
        println!(
            "Thresholds: systolic {} mmHg, diastolic {} mmHg, heart rate {} bpm",
            thresholds.systolic, thresholds.diastolic, thresholds.heart_rate
        );
        return Ok(());
    }

    let [systolic, diastolic, heart_rate] = args else {
        bail!("thresholds needs <systolic> <diastolic> <heart-rate>, or no arguments to show them");
    };
    tracker.update_thresholds(Thresholds {
        systolic: parse_measure(systolic, "systolic")?,
        diastolic: parse_measure(diastolic, "diastolic")?,
        heart_rate: parse_measure(heart_rate, "heart rate")?,
    })?;
    println!("Thresholds updated");
    Ok(())
}

fn cmd_summary(tracker: &HealthTracker) -> anyhow::Result<()> {
    match tracker.summary() {
        Some(summary) => {
            println!("Readings: {}", summary.reading_count);
            println!(
                "Average: {:.1}/{:.1} mmHg",
                summary.avg_systolic, summary.avg_diastolic
            );
            if let Some(avg_heart_rate) = summary.avg_heart_rate {
                println!("Average heart rate: {:.1} bpm", avg_heart_rate);
            }
            println!(
                "Range: systolic {}-{}, diastolic {}-{}",
                summary.min_systolic, summary.max_systolic,
                summary.min_diastolic, summary.max_diastolic
            );
            println!("Category: {}", summary.category);
            println!("Over threshold: {}", summary.over_threshold_count);
        }
        None => println!("No readings to summarize"),
    }
    Ok(())
}
