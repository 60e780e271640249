//! `segdl inspect` – print the resume snapshot of a stopped download.

use anyhow::{Context, Result};
use segdl_core::resume;
use std::path::Path;

pub fn run_inspect(path: &Path) -> Result<()> {
    let snapshot = resume::read_snapshot(path)
        .with_context(|| format!("no resume state in {}", path.display()))?;
    let size_str = snapshot
        .size
        .map(|s| format!("{s}"))
        .unwrap_or_else(|| "-".to_string());
    println!("url:        {}", snapshot.url);
    println!("size:       {}", size_str);
    println!("downloaded: {}", snapshot.downloaded());
    println!();
    println!("{:<6} {:<12} {:<12} {:<12} {}", "PART", "START", "END", "CURRENT", "STATUS");
    for (i, part) in snapshot.parts.iter().enumerate() {
        let end = part
            .end
            .map(|e| format!("{e}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<6} {:<12} {:<12} {:<12} {}",
            i,
            part.start,
            end,
            part.current,
            format!("{:?}", part.status).to_lowercase()
        );
    }
    Ok(())
}
