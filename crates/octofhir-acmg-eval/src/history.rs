//! Memoized, time-limited access to the history store
//!
//! One adapter serves every phenotype unit of a record. Identical queries share
//! a single store call, and a failing or slow store degrades to a count of 0
//! with a warning instead of failing the criterion.

use octofhir_acmg_diagnostics::{ACMG0300, ACMG0301, Diagnostic};
use octofhir_acmg_model::{HistoryQuery, HistoryStore};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

pub struct HistoryAdapter {
    store: Arc<dyn HistoryStore>,
    timeout: Duration,
    memo: Mutex<HashMap<String, Arc<OnceCell<u64>>>>,
}

/// Count plus the warning raised by the lookup that produced it, if any
#[derive(Debug)]
pub struct HistoryCount {
    pub count: u64,
    pub warning: Option<Diagnostic>,
}

impl HistoryAdapter {
    pub fn new(store: Arc<dyn HistoryStore>, timeout: Duration) -> Self {
        Self {
            store,
            timeout,
            memo: Mutex::new(HashMap::new()),
        }
    }

    /// Number of distinct queries issued so far
    pub fn memoized(&self) -> usize {
        self.memo.lock().len()
    }

    pub async fn count(&self, query: &HistoryQuery) -> HistoryCount {
        let key = query.cache_key();
        let cell = {
            let mut memo = self.memo.lock();
            match memo.get(&key) {
                Some(cell) => {
                    log::trace!("history memo hit: {key}");
                    Arc::clone(cell)
                }
                None => {
                    let cell = Arc::new(OnceCell::new());
                    memo.insert(key.clone(), Arc::clone(&cell));
                    cell
                }
            }
        };

        let mut warning = None;
        let slot = &mut warning;
        let count = *cell
            .get_or_init(|| async move {
                log::debug!("history lookup: {key}");
                match tokio::time::timeout(self.timeout, self.store.count(query)).await {
                    Ok(Ok(count)) => count,
                    Ok(Err(err)) => {
                        *slot = Some(Diagnostic::warning(
                            ACMG0300,
                            format!("{err}; `{key}` counted as 0"),
                        ));
                        0
                    }
                    Err(_) => {
                        *slot = Some(Diagnostic::warning(
                            ACMG0301,
                            format!(
                                "`{key}` did not answer within {} ms; counted as 0",
                                self.timeout.as_millis()
                            ),
                        ));
                        0
                    }
                }
            })
            .await;

        HistoryCount { count, warning }
    }
}
