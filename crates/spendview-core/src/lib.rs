//! spendview core
//!
//! Request caching and view reconciliation for the employee transaction
//! list: a cache-backed `Fetcher`, three loaders on top of it and the
//! view state machine that merges their output.

pub mod cache;
pub mod error;
pub mod fetcher;
pub mod loaders;
pub mod view;

pub use cache::{CacheKey, CacheMetrics, ResponseCache};
pub use error::{CoreError, CoreResult, DefaultErrorLogger, ErrorCode, ErrorContext, ErrorLogger, ErrorSeverity};
pub use fetcher::{Fetcher, FetcherRef, NO_PARAMS};
pub use loaders::{EmployeeDirectory, EmployeeTransactions, Loaders, PaginatedTransactions, ALL_EMPLOYEES};
pub use view::{UserAction, ViewController, ViewMachine, ViewPhase, ViewState};
