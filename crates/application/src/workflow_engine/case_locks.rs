use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use stagegate_domain::CaseId;

/// Registry of per-case mutexes. Cases never contend with each other.
#[derive(Debug, Default)]
pub(crate) struct CaseLocks {
    locks: Mutex<HashMap<CaseId, Weak<AsyncMutex<()>>>>,
}

impl CaseLocks {
    /// Waits for exclusive access to one case.
    pub(crate) async fn acquire(&self, case_id: &CaseId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.retain(|_, lock| lock.strong_count() > 0);

            match locks.get(case_id).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(AsyncMutex::new(()));
                    locks.insert(case_id.clone(), Arc::downgrade(&lock));
                    lock
                }
            }
        };

        lock.lock_owned().await
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use stagegate_domain::CaseId;

    use super::CaseLocks;

    #[tokio::test]
    async fn same_case_is_exclusive_and_other_cases_are_not() {
        let locks = Arc::new(CaseLocks::default());
        let first = CaseId::generate();
        let second = CaseId::generate();

        let held = locks.acquire(&first).await;

        let other = tokio::time::timeout(Duration::from_millis(50), locks.acquire(&second)).await;
        assert!(other.is_ok());

        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.acquire(&first)).await;
        assert!(blocked.is_err());

        drop(held);
        let reacquired =
            tokio::time::timeout(Duration::from_millis(50), locks.acquire(&first)).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn released_locks_are_pruned() {
        let locks = CaseLocks::default();
        for _ in 0..4 {
            let _guard = locks.acquire(&CaseId::generate()).await;
        }
        let _last = locks.acquire(&CaseId::generate()).await;
        assert_eq!(locks.tracked(), 1);
    }
}
