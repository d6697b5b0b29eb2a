//! Employee-scoped transaction loader

use spendview_transport::{EmployeeParams, Endpoint, Transaction};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::CoreResult;
use crate::fetcher::{FetcherRef, NO_PARAMS};

/// Value of the filter control that stands for every employee
pub const ALL_EMPLOYEES: &str = "all";

#[derive(Debug, Default)]
struct ScopedState {
    data: Option<Vec<Transaction>>,
    employee_id: Option<String>,
    /// Sequence number of the newest `fetch_by_id`
    latest: u64,
    in_flight: usize,
}

/// Loads every transaction of one employee, no pagination
#[derive(Clone)]
pub struct EmployeeTransactions {
    fetcher: FetcherRef,
    state: Arc<RwLock<ScopedState>>,
}

impl EmployeeTransactions {
    pub fn new(fetcher: FetcherRef) -> Self {
        Self {
            fetcher,
            state: Arc::new(RwLock::new(ScopedState::default())),
        }
    }

    /// Load the transactions of `employee_id`, replacing `data`.
    ///
    /// An empty id or `"all"` loads the whole unpaginated listing. A
    /// response overtaken by a newer call is returned but not stored.
    pub async fn fetch_by_id(&self, employee_id: &str) -> CoreResult<Vec<Transaction>> {
        let seq = {
            let mut state = self.state.write().await;
            state.latest += 1;
            state.in_flight += 1;
            state.latest
        };

        let result = if employee_id.is_empty() || employee_id == ALL_EMPLOYEES {
            self.fetcher
                .fetch_with_cache::<Vec<Transaction>, _>(Endpoint::AllTransactions, NO_PARAMS)
                .await
        } else {
            let params = EmployeeParams {
                employee_id: employee_id.to_string(),
            };
            self.fetcher
                .fetch_with_cache::<Vec<Transaction>, _>(Endpoint::TransactionsByEmployee, Some(&params))
                .await
        };

        let mut state = self.state.write().await;
        state.in_flight -= 1;
        let transactions = result?;

        if seq == state.latest {
            state.data = Some(transactions.clone());
            state.employee_id = Some(employee_id.to_string());
        } else {
            log::debug!("transactions for {} overtaken by a newer request", employee_id);
        }
        Ok(transactions)
    }

    pub async fn data(&self) -> Option<Vec<Transaction>> {
        self.state.read().await.data.clone()
    }

    /// Employee id the current `data` belongs to
    pub async fn employee_id(&self) -> Option<String> {
        self.state.read().await.employee_id.clone()
    }

    pub async fn loading(&self) -> bool {
        self.state.read().await.in_flight > 0
    }

    pub async fn invalidate(&self) {
        let mut state = self.state.write().await;
        state.data = None;
        state.employee_id = None;
    }
}
