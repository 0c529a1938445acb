use anyhow::Result;
use clap::Parser;
use kappa_core::{Catalog, ProgressStore};
use kappa_cv::{ScanOutcome, Scanner, XcapWindows};
use std::io::{self, BufRead};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod checklist;
mod cli;
mod command;

use checklist::Checklist;
use cli::Args;
use command::{Command, HELP};

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Run a pass on its own thread so the prompt stays responsive.
fn spawn_scan(scanner: &Arc<Scanner<XcapWindows>>) -> JoinHandle<()> {
    let scanner = Arc::clone(scanner);
    thread::spawn(move || match scanner.trigger_scan() {
        ScanOutcome::Completed(report) => {
            if !report.saved {
                warn!("Progress not saved this pass, will retry after the next scan");
            }
            info!("Scan complete. Press Enter to scan again.");
        }
        ScanOutcome::Busy => info!("Scan already in progress"),
        ScanOutcome::Cancelled { processed } => info!("Scan stopped after {processed} items"),
    })
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = args.resolve_config()?;
    let catalog = Catalog::load_or_builtin(config.catalog_file.as_deref());
    let progress = ProgressStore::load(&config.progress_file, &catalog);

    let scanner = Arc::new(Scanner::new(&config, XcapWindows, progress));
    let checklist = Checklist::new(scanner.state(), scanner.templates());

    // A pass interrupted mid-save leaves at most a stale `.tmp` sibling;
    // the progress file itself is only ever replaced by rename.
    let cancelled = scanner.cancel_flag();
    if ctrlc::set_handler(move || {
        cancelled.store(true, Ordering::Release);
        info!("Interrupted, exiting");
        std::process::exit(130);
    })
    .is_err()
    {
        error!("Failed to set CTRL+C handler, an interrupted scan may not stop cleanly");
    }

    if args.once {
        if let Err(e) = spawn_scan(&scanner).join() {
            error!("Scan thread panicked: {e:?}");
        }
        print!("{}", checklist.render());
        return Ok(());
    }

    let (owned, total) = checklist.summary();
    info!("Tracking {total} items ({owned} collected). Press Enter to scan, `help` for commands.");

    let mut worker: Option<JoinHandle<()>> = None;

    for line in io::stdin().lock().lines() {
        let line = line?;

        match line.parse::<Command>() {
            Ok(Command::Scan) => {
                if scanner.is_scanning() {
                    info!("Scan already in progress");
                    continue;
                }
                info!("Starting manual scan...");
                worker = Some(spawn_scan(&scanner));
            }
            Ok(Command::List) => print!("{}", checklist.render()),
            Ok(Command::Json) => println!("{}", serde_json::to_string_pretty(&checklist.entries())?),
            Ok(Command::Toggle(name)) => match checklist.toggle(&name) {
                Ok((item, owned)) => info!("{item} marked {}", if owned { "collected" } else { "missing" }),
                Err(e) => warn!("{e}"),
            },
            Ok(Command::Help) => println!("{HELP}"),
            Ok(Command::Quit) => break,
            Err(e) => warn!("{e}"),
        }
    }

    scanner.cancel();
    if let Some(worker) = worker {
        if worker.join().is_err() {
            error!("Scan thread panicked");
        }
    }

    info!("Bye");
    Ok(())
}
