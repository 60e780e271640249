//! `segdl config` – show where the config lives and what it holds.

use anyhow::Result;
use segdl_core::config::{self, SegdlConfig};

pub fn run_config(cfg: &SegdlConfig) -> Result<()> {
    println!("config file: {}", config::config_path()?.display());
    println!("max_connections   {}", cfg.max_connections);
    println!("part_size         {}", cfg.part_size);
    println!("resume            {}", cfg.resume);
    println!("user_agent        {}", cfg.user_agent);
    println!("tail_parts        {}", cfg.schedule.tail_parts);
    println!("reserved_prefix   {}", cfg.schedule.reserved_prefix);
    println!("probe_attempts    {}", cfg.retry.probe_attempts);
    println!("part_backoff_ms   {}", cfg.retry.part_backoff_ms);
    println!("speed_interval_ms {}", cfg.retry.speed_interval_ms);
    Ok(())
}
