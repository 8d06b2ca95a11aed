//! Domain snapshot files consumed by `balance` and `balloon`.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use qmemman_core::{Domain, DomainId, DomainStore, RefreshOutcome, RejectionSink};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    /// Free host memory in bytes.
    pub xen_free_memory: i64,
    #[serde(default)]
    pub domains: Vec<SnapshotDomain>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotDomain {
    pub id: u32,
    pub memory_actual: i64,
    /// Raw, untrusted meminfo text as the domain reported it.
    #[serde(default)]
    pub meminfo: Option<String>,
    #[serde(default)]
    pub no_progress: bool,
}

/// Store built from a snapshot, with the number of reports refused.
pub struct LoadedSnapshot {
    pub xen_free_memory: i64,
    pub store: DomainStore,
    pub rejected: usize,
}

impl Snapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
        let snapshot: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot: {}", path.display()))?;
        snapshot.check_unique_ids()?;
        Ok(snapshot)
    }

    fn check_unique_ids(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for domain in &self.domains {
            if !seen.insert(domain.id) {
                bail!("Duplicate domain id {} in snapshot", domain.id);
            }
        }
        Ok(())
    }

    /// Register every domain, then feed its report through validation.
    pub fn into_store(self, sink: &dyn RejectionSink) -> LoadedSnapshot {
        let mut store = DomainStore::new();
        let mut rejected = 0;
        for entry in self.domains {
            let id = DomainId::new(entry.id);
            let mut domain = Domain::new(id, entry.memory_actual);
            domain.no_progress = entry.no_progress;
            store.insert(domain);
            if let Some(report) = entry.meminfo {
                if store.refresh_meminfo(id, &report, sink) == RefreshOutcome::Rejected {
                    rejected += 1;
                }
            }
        }
        LoadedSnapshot {
            xen_free_memory: self.xen_free_memory,
            store,
            rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qmemman_core::RecordingSink;
    use tempfile::tempdir;

    const SNAPSHOT: &str = r#"
xen_free_memory = 104857600

[[domains]]
id = 0
memory_actual = 1073741824
meminfo = """
MemTotal: 1000000 kB
MemFree: 200000 kB
Buffers: 10000 kB
Cached: 90000 kB
SwapTotal: 0 kB
SwapFree: 0 kB
"""

[[domains]]
id = 3
memory_actual = 536870912
meminfo = "MemTotal: 10 kB\nMemFree: 20 kB\n"

[[domains]]
id = 5
memory_actual = 268435456
no_progress = true
"#;

    #[test]
    fn test_load_and_build_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.toml");
        std::fs::write(&path, SNAPSHOT).unwrap();

        let sink = RecordingSink::new();
        let loaded = Snapshot::load(&path).unwrap().into_store(&sink);

        assert_eq!(loaded.xen_free_memory, 104_857_600);
        assert_eq!(loaded.store.len(), 3);
        assert_eq!(loaded.rejected, 1);
        assert_eq!(sink.len(), 1);

        let live: Vec<u32> = loaded.store.live_domains().map(|d| d.id().get()).collect();
        assert_eq!(live, vec![0]);
        assert!(loaded.store.get(DomainId::new(5)).unwrap().no_progress);
    }

    #[test]
    fn test_duplicate_ids_are_refused() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dup.toml");
        std::fs::write(
            &path,
            "xen_free_memory = 0\n[[domains]]\nid = 1\nmemory_actual = 1\n\
             [[domains]]\nid = 1\nmemory_actual = 2\n",
        )
        .unwrap();

        let err = Snapshot::load(&path).unwrap_err();
        assert!(err.to_string().contains("Duplicate domain id 1"));
    }

    #[test]
    fn test_missing_free_memory_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[[domains]]\nid = 1\nmemory_actual = 1\n").unwrap();

        let err = Snapshot::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse snapshot"));
    }
}
