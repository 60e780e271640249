//! `segdl get` – download one URL with a progress monitor.

use anyhow::{bail, Context, Result};
use segdl_core::config::SegdlConfig;
use segdl_core::scheduler::ProgressStats;
use segdl_core::{DownloadJob, JobOptions, JobState};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::GetArgs;

const PROGRESS_INTERVAL_MS: u64 = 500;

fn options(cfg: &SegdlConfig, args: GetArgs) -> Result<JobOptions> {
    let dir = match args.dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("cannot determine current directory")?,
    };
    let mut opts = JobOptions::from_config(cfg, args.url, dir).resume(!args.no_resume);
    if let Some(name) = args.output {
        opts = opts.filename(name);
    }
    for (name, value) in args.headers {
        opts = opts.header(name, value);
    }
    if let Some(n) = args.connections {
        opts = opts.max_connections(n);
    }
    if let Some(bytes) = args.part_size {
        opts = opts.part_size(bytes);
    }
    if let Some(pct) = args.start_from {
        opts = opts.start_from(pct);
    }
    Ok(opts)
}

/// One carriage-return-led status line, overwritten in place on each tick.
fn progress_line(stats: &ProgressStats) -> String {
    let done_mib = stats.bytes_done as f64 / 1_048_576.0;
    let rate_mib = stats.bytes_per_sec / 1_048_576.0;
    let eta = stats
        .eta()
        .map(|d| format!("{:.0}s", d.as_secs_f64()))
        .unwrap_or_else(|| "?".to_string());
    match (stats.total_bytes, stats.fraction()) {
        (Some(total), Some(fraction)) => format!(
            "\r  {:.1} / {:.1} MiB ({:.1}%)  {:.2} MiB/s  ETA {}  [{}/{} conn]  ",
            done_mib,
            total as f64 / 1_048_576.0,
            fraction * 100.0,
            rate_mib,
            eta,
            stats.active_connections,
            stats.max_connections
        ),
        _ => format!(
            "\r  {:.1} MiB  {:.2} MiB/s  [{}/{} conn]  ",
            done_mib, rate_mib, stats.active_connections, stats.max_connections
        ),
    }
}

fn print_progress(stats: &ProgressStats) {
    print!("{}", progress_line(stats));
    let _ = std::io::stdout().flush();
}

async fn stop(job: &Arc<DownloadJob>) -> Result<()> {
    let job = Arc::clone(job);
    tokio::task::spawn_blocking(move || job.stop(false)).await??;
    Ok(())
}

pub async fn run_get(cfg: &SegdlConfig, args: GetArgs) -> Result<()> {
    let opts = options(cfg, args)?;
    let job = tokio::task::spawn_blocking(move || DownloadJob::open_default(opts)).await??;
    let job = Arc::new(job);
    if job.state() == JobState::Error {
        bail!(
            "{}",
            job.failure()
                .unwrap_or_else(|| "download failed".to_string())
        );
    }

    println!("Saving to {}", job.full_path().display());
    if job.start_downloaded() > 0 {
        println!(
            "Resuming at {:.1} MiB",
            job.start_downloaded() as f64 / 1_048_576.0
        );
    }
    job.start()?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(Duration::from_millis(PROGRESS_INTERVAL_MS));
    loop {
        tokio::select! {
            res = &mut ctrl_c => {
                res.context("failed to listen for Ctrl-C")?;
                println!();
                stop(&job).await?;
                println!(
                    "Stopped at {:.1} MiB; run the same command again to resume.",
                    job.downloaded() as f64 / 1_048_576.0
                );
                return Ok(());
            }
            _ = ticker.tick() => {
                print_progress(&job.progress_stats());
                if job.state() != JobState::Downloading {
                    break;
                }
            }
        }
    }
    println!();

    stop(&job).await?;
    match job.state() {
        JobState::Completed => {
            println!("Done: {}", job.full_path().display());
            Ok(())
        }
        state => bail!(
            "download ended in state {}: {}",
            state,
            job.failure().unwrap_or_else(|| "unknown error".to_string())
        ),
    }
}
