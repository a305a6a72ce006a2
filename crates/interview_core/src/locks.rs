//! crates/interview_core/src/locks.rs
//!
//! Per-interview mutual exclusion. Turn submission and grading for the same
//! interview never run at the same time; different interviews never block each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

type LockTable = StdMutex<HashMap<Uuid, Arc<Mutex<()>>>>;

#[derive(Default)]
pub struct InterviewLocks {
    table: Arc<LockTable>,
}

impl InterviewLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the lock only if nobody else holds it.
    pub fn try_acquire(&self, interview_id: Uuid) -> Option<InterviewGuard> {
        let lock = self.entry(interview_id);
        match lock.try_lock_owned() {
            Ok(guard) => Some(self.wrap(interview_id, guard)),
            Err(_) => {
                // Our reference went with the failed attempt. The holder may have
                // released in between, seen that reference and kept the entry.
                remove_if_idle(&self.table, interview_id);
                None
            }
        }
    }

    /// Waits until the lock is free.
    pub async fn acquire(&self, interview_id: Uuid) -> InterviewGuard {
        let lock = self.entry(interview_id);
        let guard = lock.lock_owned().await;
        self.wrap(interview_id, guard)
    }

    /// Number of interviews that currently have a lock entry.
    pub fn len(&self) -> usize {
        self.table.lock().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, interview_id: Uuid) -> Arc<Mutex<()>> {
        let mut table = match self.table.lock() {
            Ok(table) => table,
            Err(poisoned) => poisoned.into_inner(),
        };
        table
            .entry(interview_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn wrap(&self, interview_id: Uuid, guard: OwnedMutexGuard<()>) -> InterviewGuard {
        InterviewGuard {
            interview_id,
            table: self.table.clone(),
            _guard: guard,
        }
    }
}

/// Held for the duration of one write sequence on an interview.
pub struct InterviewGuard {
    interview_id: Uuid,
    table: Arc<LockTable>,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for InterviewGuard {
    fn drop(&mut self) {
        // The guard's own reference is still alive here.
        remove_if_idle_with(&self.table, self.interview_id, 2);
    }
}

/// Drops the entry when nobody outside the table holds its lock.
fn remove_if_idle(table: &LockTable, interview_id: Uuid) {
    remove_if_idle_with(table, interview_id, 1);
}

fn remove_if_idle_with(table: &LockTable, interview_id: Uuid, known_refs: usize) {
    let mut table = match table.lock() {
        Ok(table) => table,
        Err(poisoned) => poisoned.into_inner(),
    };
    let idle = table
        .get(&interview_id)
        .map(|lock| Arc::strong_count(lock) <= known_refs)
        .unwrap_or(false);
    if idle {
        table.remove(&interview_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn second_writer_is_rejected_while_first_holds_the_lock() {
        let locks = InterviewLocks::new();
        let id = Uuid::new_v4();

        let first = locks.try_acquire(id);
        assert!(first.is_some());
        assert!(locks.try_acquire(id).is_none());

        drop(first);
        assert!(locks.try_acquire(id).is_some());
    }

    #[tokio::test]
    async fn different_interviews_do_not_contend() {
        let locks = InterviewLocks::new();
        let _a = locks.try_acquire(Uuid::new_v4()).unwrap();
        let _b = locks.try_acquire(Uuid::new_v4()).unwrap();
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn entries_are_dropped_once_released() {
        let locks = InterviewLocks::new();
        let id = Uuid::new_v4();
        {
            let _guard = locks.acquire(id).await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn waiting_acquire_proceeds_after_release() {
        let locks = Arc::new(InterviewLocks::new());
        let id = Uuid::new_v4();
        let held = locks.acquire(id).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(id).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        drop(held);
        waiter.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn rejected_attempt_cleans_up_an_entry_released_meanwhile() {
        let locks = InterviewLocks::new();
        let id = Uuid::new_v4();
        let guard = locks.try_acquire(id).unwrap();

        // A contender is between its table lookup and its lock attempt while the
        // holder releases: the holder sees the extra reference and keeps the entry.
        let contender = locks.entry(id);
        drop(guard);
        assert_eq!(locks.len(), 1);

        drop(contender);
        remove_if_idle(&locks.table, id);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn failed_try_acquire_leaves_no_idle_entry_behind() {
        let locks = InterviewLocks::new();
        let id = Uuid::new_v4();
        let guard = locks.try_acquire(id).unwrap();
        assert!(locks.try_acquire(id).is_none());
        assert_eq!(locks.len(), 1);

        drop(guard);
        assert!(locks.is_empty());
    }
}
