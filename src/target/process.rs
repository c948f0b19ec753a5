use crate::target::TargetError;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// The game process whose memory is read
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetProcess {
    pub pid: u32,
    pub name: String,
}

impl TargetProcess {
    /// Resolves a PID or a name substring against `/proc`
    pub fn resolve(query: &str) -> Result<Self, TargetError> {
        Self::resolve_in(Path::new("/proc"), query)
    }

    /// Same as [`TargetProcess::resolve`] against an arbitrary procfs root
    pub fn resolve_in(proc_root: &Path, query: &str) -> Result<Self, TargetError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(TargetError::NotFound(query.to_string()));
        }

        let target = if let Ok(pid) = query.parse::<u32>() {
            let name = read_comm(proc_root, pid)
                .ok_or_else(|| TargetError::NotFound(query.to_string()))?;
            Self { pid, name }
        } else {
            let mut pids = list_pids(proc_root)?;
            pids.sort_unstable();
            debug!("Scanning {} processes for {:?}", pids.len(), query);
            pids.into_iter()
                .find_map(|pid| {
                    read_comm(proc_root, pid)
                        .filter(|name| name.contains(query))
                        .map(|name| Self { pid, name })
                })
                .ok_or_else(|| TargetError::NotFound(query.to_string()))?
        };

        if target.pid == 0 || target.name.is_empty() {
            return Err(TargetError::NotFound(query.to_string()));
        }
        info!("Target process: {} (pid {})", target.name, target.pid);
        Ok(target)
    }

    /// Name used to pick the per-game configuration layer
    ///
    /// Everything up to the first `.`, so `th06.exe` becomes `th06`.
    pub fn game_name(&self) -> &str {
        self.name.split('.').next().unwrap_or(&self.name)
    }
}

fn read_comm(proc_root: &Path, pid: u32) -> Option<String> {
    let comm = fs::read_to_string(proc_root.join(pid.to_string()).join("comm")).ok()?;
    let name = comm.trim_end().to_string();
    (!name.is_empty()).then_some(name)
}

fn list_pids(proc_root: &Path) -> Result<Vec<u32>, TargetError> {
    let entries = fs::read_dir(proc_root).map_err(|source| TargetError::Procfs {
        path: proc_root.to_path_buf(),
        source,
    })?;
    Ok(entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().to_str()?.parse().ok())
        .collect())
}
