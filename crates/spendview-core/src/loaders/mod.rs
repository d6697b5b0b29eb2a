//! Loaders over the shared fetcher

pub mod by_employee;
pub mod employees;
pub mod paginated;

pub use by_employee::{EmployeeTransactions, ALL_EMPLOYEES};
pub use employees::EmployeeDirectory;
pub use paginated::PaginatedTransactions;

use crate::fetcher::FetcherRef;

/// Every loader of one session, all backed by the same fetcher
#[derive(Clone)]
pub struct Loaders {
    pub fetcher: FetcherRef,
    pub directory: EmployeeDirectory,
    pub pager: PaginatedTransactions,
    pub scoped: EmployeeTransactions,
}

impl Loaders {
    pub fn new(fetcher: FetcherRef) -> Self {
        Self {
            directory: EmployeeDirectory::new(fetcher.clone()),
            pager: PaginatedTransactions::new(fetcher.clone()),
            scoped: EmployeeTransactions::new(fetcher.clone()),
            fetcher,
        }
    }

    /// True while any loader or the fetcher is busy
    pub async fn loading(&self) -> bool {
        self.directory.loading().await || self.pager.loading().await || self.scoped.loading().await
    }
}
