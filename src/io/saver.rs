use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use crate::io::reconcile::{self, PersistError, Snapshot};
use crate::io::store::DocumentStore;

#[derive(Default)]
struct State {
    pending: Option<Snapshot>,
    in_flight: bool,
    shutdown: bool,
    last_error: Option<PersistError>,
    completed: usize,
}

struct Shared {
    state: Mutex<State>,
    changed: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, State>) -> MutexGuard<'a, State> {
        self.changed.wait(guard).unwrap_or_else(|e| e.into_inner())
    }
}

/// Background saver for one user.
///
/// Saves run on a single worker thread, one at a time. While a save is in
/// flight, newly scheduled snapshots replace each other so only the latest
/// one is written next; earlier pending states are never written.
pub struct Saver {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl Saver {
    pub fn spawn(store: Arc<dyn DocumentStore>, user_id: impl Into<String>) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(State::default()),
            changed: Condvar::new(),
        });
        let user_id = user_id.into();
        let worker_shared = Arc::clone(&shared);
        let worker = thread::spawn(move || run(&worker_shared, store.as_ref(), &user_id));
        Saver {
            shared,
            worker: Some(worker),
        }
    }

    /// Queue `snapshot` for saving. Returns immediately.
    pub fn schedule(&self, snapshot: Snapshot) {
        let mut state = self.shared.lock();
        if state.pending.replace(snapshot).is_some() {
            tracing::trace!("superseded a pending save");
        }
        self.shared.changed.notify_all();
    }

    /// Block until every scheduled snapshot has been written or superseded.
    /// Returns the failure of the most recent save, if it failed.
    pub fn flush(&self) -> Result<(), PersistError> {
        let mut state = self.shared.lock();
        while state.pending.is_some() || state.in_flight {
            state = self.shared.wait(state);
        }
        match state.last_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Number of saves attempted so far
    pub fn completed(&self) -> usize {
        self.shared.lock().completed
    }
}

impl Drop for Saver {
    fn drop(&mut self) {
        self.shared.lock().shutdown = true;
        self.shared.changed.notify_all();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run(shared: &Shared, store: &dyn DocumentStore, user_id: &str) {
    loop {
        let snapshot = {
            let mut state = shared.lock();
            loop {
                if let Some(snapshot) = state.pending.take() {
                    state.in_flight = true;
                    break snapshot;
                }
                if state.shutdown {
                    return;
                }
                state = shared.wait(state);
            }
        };

        let result = reconcile::save_snapshot(store, user_id, &snapshot);

        let mut state = shared.lock();
        state.in_flight = false;
        state.completed += 1;
        match result {
            Ok(()) => {
                tracing::debug!(user = user_id, "background save done");
                // a later successful full rewrite supersedes an earlier failure
                state.last_error = None;
            }
            Err(err) => {
                tracing::error!(user = user_id, error = %err, "background save failed");
                state.last_error = Some(err);
            }
        }
        shared.changed.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::store::{Document, MemoryStore, StoreError, WriteBatch};
    use crate::model::task::{Task, TaskTree};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn snapshot_with(content: &str) -> Snapshot {
        Snapshot {
            tree: TaskTree::from_tasks(vec![Task::new(1, content)]),
            ..Snapshot::default()
        }
    }

    /// Store that takes a while to commit and records overlapping commits
    #[derive(Default)]
    struct SlowStore {
        inner: MemoryStore,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl DocumentStore for SlowStore {
        fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
            self.inner.list(collection)
        }

        fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            let result = self.inner.commit(batch);
            self.active.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    #[test]
    fn latest_snapshot_wins_and_saves_never_overlap() {
        let store = Arc::new(SlowStore::default());
        let saver = Saver::spawn(store.clone(), "u");
        for i in 0..50 {
            saver.schedule(snapshot_with(&format!("state {}", i)));
        }
        saver.flush().unwrap();

        let loaded = reconcile::load_snapshot(&store.inner, "u").unwrap();
        assert_eq!(loaded.tree.tasks()[0].content, "state 49");
        assert_eq!(store.max_active.load(Ordering::SeqCst), 1);
        // intermediate states were coalesced
        assert!(store.inner.commit_count() < 50);
        assert_eq!(store.inner.commit_count(), saver.completed());
    }

    #[test]
    fn flush_reports_failure_then_recovers() {
        let store = Arc::new(MemoryStore::new());
        let saver = Saver::spawn(store.clone(), "u");

        store.fail_next_commits(1);
        saver.schedule(snapshot_with("lost"));
        assert!(matches!(saver.flush(), Err(PersistError::SaveFailed { .. })));
        // the error is reported once
        assert!(saver.flush().is_ok());

        saver.schedule(snapshot_with("kept"));
        saver.flush().unwrap();
        let loaded = reconcile::load_snapshot(store.as_ref(), "u").unwrap();
        assert_eq!(loaded.tree.tasks()[0].content, "kept");
    }

    #[test]
    fn drop_drains_pending_save() {
        let store = Arc::new(SlowStore::default());
        {
            let saver = Saver::spawn(store.clone(), "u");
            saver.schedule(snapshot_with("first"));
            saver.schedule(snapshot_with("last"));
        }
        let loaded = reconcile::load_snapshot(&store.inner, "u").unwrap();
        assert_eq!(loaded.tree.tasks()[0].content, "last");
    }

    #[test]
    fn flush_with_nothing_scheduled_returns_immediately() {
        let saver = Saver::spawn(Arc::new(MemoryStore::new()), "u");
        assert!(saver.flush().is_ok());
        assert_eq!(saver.completed(), 0);
    }
}
