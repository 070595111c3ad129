//! Process table enumeration.
//!
//! # Panic-Free Guarantees
//!
//! A poisoned lock is recovered rather than propagated: the guarded
//! `System` is only a refresh cache and stays usable after a panic
//! elsewhere.

use std::sync::{Mutex, PoisonError};

use sysinfo::{Process, System, ThreadKind, Users};
use tracing::trace;
use vigil_core::{IdentityKey, Record, RecordKind, ResourceId, Snapshot, SnapshotBuilder};

/// Field names of a process record, in column order.
pub const PROCESS_COLUMNS: [&str; 8] = [
    "pid",
    "name",
    "username",
    "cpu_percent",
    "memory_percent",
    "status",
    "num_threads",
    "ppid",
];

struct ProcessState {
    system: System,
    users: Users,
}

/// Enumerates OS processes through `sysinfo`.
///
/// One `System` is kept across polls so CPU usage has a baseline; the
/// first snapshot reports `0.0` for every process.
pub struct ProcessAdapter {
    state: Mutex<ProcessState>,
}

impl ProcessAdapter {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ProcessState {
                system: System::new(),
                users: Users::new_with_refreshed_list(),
            }),
        }
    }

    /// Snapshots every process visible to this user, ordered by pid.
    ///
    /// Userland threads are not listed as processes. Attributes that
    /// cannot be read are left absent rather than failing the batch.
    pub fn snapshot(&self) -> Snapshot {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let state = &mut *guard;

        // refresh_all() is required for CPU calculation to work
        state.system.refresh_all();
        let total_memory = state.system.total_memory();

        let mut processes: Vec<&Process> = state
            .system
            .processes()
            .values()
            .filter(|p| !matches!(p.thread_kind(), Some(ThreadKind::Userland)))
            .collect();
        processes.sort_by_key(|p| p.pid().as_u32());

        let mut builder = SnapshotBuilder::with_capacity(ResourceId::Processes, processes.len());
        for process in processes {
            let record = process_record(process, &state.users, total_memory);
            if let Err(e) = builder.push(record) {
                trace!(error = %e, "Skipping duplicate pid");
            }
        }

        let snapshot = builder.build();
        trace!(processes = snapshot.len(), "Process table enumerated");
        snapshot
    }
}

impl Default for ProcessAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProcessAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessAdapter").finish_non_exhaustive()
    }
}

fn process_record(process: &Process, users: &Users, total_memory: u64) -> Record {
    let pid = process.pid().as_u32();
    let username = process
        .user_id()
        .and_then(|uid| users.get_user_by_id(uid))
        .map(|user| user.name().to_string());
    let num_threads = process
        .tasks()
        .map(|tasks| u64::try_from(tasks.len()).unwrap_or(u64::MAX).max(1));

    Record::new(IdentityKey::for_pid(pid), RecordKind::Process)
        .with("pid", pid)
        .with("name", process.name().to_string_lossy().into_owned())
        .with("username", username)
        .with("cpu_percent", format!("{:.1}", process.cpu_usage()))
        .with(
            "memory_percent",
            format!("{:.1}", memory_percent(process.memory(), total_memory)),
        )
        .with("status", process.status().to_string().to_lowercase())
        .with("num_threads", num_threads)
        .with("ppid", process.parent().map(|p| p.as_u32()))
}

fn memory_percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    used as f64 / total as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::FieldValue;

    // Per CLAUDE.md: Tests CAN use .unwrap()

    #[test]
    fn test_memory_percent() {
        assert_eq!(memory_percent(0, 0), 0.0);
        assert_eq!(memory_percent(50, 200), 25.0);
    }

    #[test]
    fn test_snapshot_contains_current_process() {
        let adapter = ProcessAdapter::new();
        let snapshot = adapter.snapshot();

        let me = snapshot
            .get(&IdentityKey::for_pid(std::process::id()))
            .unwrap();
        assert_eq!(me.kind, RecordKind::Process);
        assert_eq!(
            me.value("pid"),
            &FieldValue::from(std::process::id())
        );
        assert!(!me.value("name").is_empty());
    }

    #[test]
    fn test_snapshot_is_ordered_by_pid() {
        let snapshot = ProcessAdapter::new().snapshot();
        let pids: Vec<u32> = snapshot.keys().filter_map(IdentityKey::as_pid).collect();
        let mut sorted = pids.clone();
        sorted.sort_unstable();
        assert_eq!(pids, sorted);
    }

    #[test]
    fn test_fields_follow_column_order() {
        let snapshot = ProcessAdapter::new().snapshot();
        let me = snapshot
            .get(&IdentityKey::for_pid(std::process::id()))
            .unwrap();

        let names: Vec<&str> = me.field_names().collect();
        let expected: Vec<&str> = PROCESS_COLUMNS
            .iter()
            .copied()
            .filter(|c| names.contains(c))
            .collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_percentages_have_one_decimal() {
        let snapshot = ProcessAdapter::new().snapshot();
        let me = snapshot
            .get(&IdentityKey::for_pid(std::process::id()))
            .unwrap();
        let cpu = me.value("cpu_percent").to_string();
        let (_, decimals) = cpu.split_once('.').unwrap();
        assert_eq!(decimals.len(), 1);
    }
}
