use std::path::Path;

use anyhow::{Result, bail};
use qmemman_core::{DomainStore, MemoryPolicy, MemoryTarget, TracingSink, balance, balloon};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::snapshot::Snapshot;

const MIB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Serialize)]
struct PlannedRequest {
    domain: u32,
    memory_actual: i64,
    target_bytes: i64,
    delta: i64,
}

fn describe(store: &DomainStore, plan: &[MemoryTarget]) -> Vec<PlannedRequest> {
    plan.iter()
        .map(|request| {
            let memory_actual = store
                .get(request.domain)
                .map(|d| d.memory_actual)
                .unwrap_or_default();
            PlannedRequest {
                domain: request.domain.get(),
                memory_actual,
                target_bytes: request.target_bytes,
                delta: request.target_bytes - memory_actual,
            }
        })
        .collect()
}

pub(crate) fn handle_balance(
    snapshot_path: &Path,
    policy: &MemoryPolicy,
    format: OutputFormat,
) -> Result<()> {
    let loaded = Snapshot::load(snapshot_path)?.into_store(&TracingSink);
    let plan = balance(loaded.xen_free_memory, &loaded.store, policy);
    tracing::debug!(requests = plan.len(), "balance plan computed");

    let requests = describe(&loaded.store, &plan);
    match format {
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "xen_free_memory": loaded.xen_free_memory,
                "rejected_reports": loaded.rejected,
                "requests": requests,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Text => {
            if loaded.rejected > 0 {
                eprintln!("{} meminfo report(s) rejected", loaded.rejected);
            }
            if requests.is_empty() {
                eprintln!("No live domains to balance.");
            }
            print_requests_text(&requests);
        }
    }
    Ok(())
}

pub(crate) fn handle_balloon(
    snapshot_path: &Path,
    requested_bytes: i64,
    policy: &MemoryPolicy,
    format: OutputFormat,
) -> Result<()> {
    let loaded = Snapshot::load(snapshot_path)?.into_store(&TracingSink);
    let plan = balloon(requested_bytes, &loaded.store, policy);
    if plan.is_empty() {
        bail!(
            "Cannot free {} bytes: donor domains do not have enough spare memory",
            requested_bytes
        );
    }

    let requests = describe(&loaded.store, &plan);
    match format {
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "requested_bytes": requested_bytes,
                "rejected_reports": loaded.rejected,
                "requests": requests,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Text => {
            let freed: i64 = requests.iter().map(|r| -r.delta).sum();
            eprintln!(
                "Freeing {:.1} MiB (requested {:.1} MiB)",
                freed as f64 / MIB,
                requested_bytes as f64 / MIB
            );
            print_requests_text(&requests);
        }
    }
    Ok(())
}

fn print_requests_text(requests: &[PlannedRequest]) {
    for request in requests {
        println!(
            "dom{}: {} -> {} ({:+.1} MiB)",
            request.domain,
            request.memory_actual,
            request.target_bytes,
            request.delta as f64 / MIB
        );
    }
}
