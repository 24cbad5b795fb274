//! Medrec maintenance tool
//!
//! Verifies, inspects, compacts, backs up and restores a hospital record store.
//! Results are printed to stdout as JSON; logs go to stderr.

mod config;

use clap::Parser;
use medrec_persistence::{HospitalStore, StorageError};
use serde::Serialize;
use tracing::info;

use crate::config::{CliConfig, Command, CompactTarget};

/// Initializes the tracing subscriber. `RUST_LOG` overrides `level`.
fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("medrec={level},medrec_persistence={level}"))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(
        data_dir = %config.data_dir.display(),
        command = ?config.command,
        "Opening hospital store"
    );
    let store = HospitalStore::open(config.store_config())?;

    run(&store, &config.command)
}

fn run(store: &HospitalStore, command: &Command) -> anyhow::Result<()> {
    match command {
        Command::Verify => print_json(&store.verify()?),
        Command::Stats => print_json(&store.stats()?),
        Command::Compact { target } => match CompactTarget::parse(target) {
            Some(CompactTarget::All) => {
                let reports = store.compact_all()?;
                store.save_hospital()?;
                print_json(&reports)
            }
            Some(CompactTarget::One(kind)) => {
                let report = store.compact(kind)?;
                store.save_hospital()?;
                print_json(&report)
            }
            None => anyhow::bail!("Unknown compaction target '{}'", target),
        },
        Command::Backup => {
            // Archive the snapshot as it is now, not as it was last saved.
            store.save_hospital()?;
            print_json(&store.backup()?)
        }
        Command::Restore => print_json(&store.restore()?),
        Command::History { patient_id } => match store.history(*patient_id)? {
            Some(entries) => print_json(&entries),
            None => anyhow::bail!("Patient {} not found", patient_id),
        },
        Command::CheckChain { patient_id } => match store.verify_chain(*patient_id) {
            Ok(Some(audit)) => {
                print_json(&audit)?;
                if !audit.is_consistent() {
                    std::process::exit(2);
                }
                Ok(())
            }
            Ok(None) => anyhow::bail!("Patient {} not found", patient_id),
            Err(e @ StorageError::Ledger(_)) => {
                eprintln!("History chain is broken: {}", e);
                std::process::exit(2);
            }
            Err(e) => Err(e.into()),
        },
    }
}
