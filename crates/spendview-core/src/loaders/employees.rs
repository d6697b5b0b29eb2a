//! Employee directory loader

use spendview_transport::{Employee, Endpoint};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::CoreResult;
use crate::fetcher::{FetcherRef, NO_PARAMS};

#[derive(Debug, Default)]
struct DirectoryState {
    /// `None` until the first successful load
    data: Option<Vec<Employee>>,
    in_flight: usize,
}

/// Loads the employee roster once and keeps it for the filter control
#[derive(Clone)]
pub struct EmployeeDirectory {
    fetcher: FetcherRef,
    state: Arc<RwLock<DirectoryState>>,
}

impl EmployeeDirectory {
    pub fn new(fetcher: FetcherRef) -> Self {
        Self {
            fetcher,
            state: Arc::new(RwLock::new(DirectoryState::default())),
        }
    }

    /// Load the roster (a cache hit after the first call)
    pub async fn fetch_all(&self) -> CoreResult<Vec<Employee>> {
        self.state.write().await.in_flight += 1;

        let result = self
            .fetcher
            .fetch_with_cache::<Vec<Employee>, _>(Endpoint::Employees, NO_PARAMS)
            .await;

        let mut state = self.state.write().await;
        state.in_flight -= 1;
        let employees = result?;
        log::debug!("employee directory loaded: {} entries", employees.len());
        state.data = Some(employees.clone());
        Ok(employees)
    }

    pub async fn data(&self) -> Option<Vec<Employee>> {
        self.state.read().await.data.clone()
    }

    pub async fn loading(&self) -> bool {
        self.state.read().await.in_flight > 0 || self.fetcher.loading()
    }

    /// Forget the roster; the next `fetch_all` reloads it
    pub async fn invalidate(&self) {
        self.state.write().await.data = None;
    }
}
