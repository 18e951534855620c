use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::task::JoinHandle;

// A minimal "simple one-for-one" child tracker (spec §9): every Peer or
// Connector task a node spawns is registered here under a supervisor id.
// Restart policy (`transient`) is the coordinator's call, not this type's —
// `ChildSupervisor` only tracks liveness and provides abort-all for shutdown.
pub struct ChildSupervisor {
    children: DashMap<u64, JoinHandle<()>>,
    next_id: AtomicU64,
}

impl ChildSupervisor {
    pub fn new() -> Self {
        ChildSupervisor {
            children: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn add(&self, handle: JoinHandle<()>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.children.insert(id, handle);
        id
    }

    pub fn remove(&self, id: u64) {
        self.children.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    // Aborts every tracked child. Used on node shutdown; does not wait for
    // the aborted tasks to actually finish unwinding.
    pub fn shutdown(&self) {
        for entry in self.children.iter() {
            entry.value().abort();
        }
        self.children.clear();
    }
}

impl Default for ChildSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn tracks_and_removes_children() {
        let supervisor = ChildSupervisor::new();
        let id = supervisor.add(tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }));
        assert_eq!(supervisor.len(), 1);
        supervisor.remove(id);
        assert_eq!(supervisor.len(), 0);
    }

    #[tokio::test]
    async fn shutdown_aborts_every_child() {
        let supervisor = ChildSupervisor::new();
        let handle = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        supervisor.add(handle);
        supervisor.shutdown();
        assert_eq!(supervisor.len(), 0);
    }
}
