use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use qmemman_core::{ValidatedMeminfo, parse_meminfo};

use crate::cli::OutputFormat;

fn read_report(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read meminfo from stdin")?;
        return Ok(content);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read meminfo: {}", path.display()))
}

pub(crate) fn handle_check_meminfo(path: &Path, format: OutputFormat) -> Result<()> {
    let raw = parse_meminfo(&read_report(path)?);
    let meminfo = match ValidatedMeminfo::from_raw(&raw) {
        Ok(meminfo) => meminfo,
        Err(reason) => {
            tracing::debug!(raw = ?raw, "meminfo rejected");
            bail!("Rejected: {reason}");
        }
    };

    match format {
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "accepted": true,
                "meminfo": meminfo,
                "mem_used": meminfo.mem_used(),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Text => {
            println!("MemTotal:  {}", meminfo.mem_total());
            println!("MemFree:   {}", meminfo.mem_free());
            println!("Buffers:   {}", meminfo.buffers());
            println!("Cached:    {}", meminfo.cached());
            println!("SwapTotal: {}", meminfo.swap_total());
            println!("SwapFree:  {}", meminfo.swap_free());
            println!("mem_used:  {}", meminfo.mem_used());
        }
    }
    Ok(())
}
