//! In-memory backend
//!
//! Serves a `Dataset` through the `Transport` trait with simulated latency,
//! one-shot failure injection and per-endpoint request counters. It is the
//! backend of the CLI session and the fake transport of every test.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

use crate::endpoint::{ApprovalParams, Endpoint, EmployeeParams, PageParams};
use crate::error::TransportError;
use crate::models::{Employee, Page, Transaction};
use crate::Transport;

/// Employees and their transactions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub employees: Vec<Employee>,
    pub transactions: Vec<Transaction>,
}

impl Dataset {
    /// Parse a dataset from JSON text
    pub fn from_json(content: &str) -> Result<Self, TransportError> {
        serde_json::from_str(content).map_err(|e| TransportError::Dataset {
            message: e.to_string(),
        })
    }

    /// Read a dataset from a JSON file
    pub fn load(path: &Path) -> Result<Self, TransportError> {
        let content = std::fs::read_to_string(path).map_err(|e| TransportError::Dataset {
            message: format!("{}: {}", path.display(), e),
        })?;
        Self::from_json(&content)
    }

    /// Built-in demo data: four employees, fourteen transactions
    pub fn sample() -> Self {
        let employees = vec![
            Employee::new("emp-1", "James", "Smith"),
            Employee::new("emp-2", "Mary", "Johnson"),
            Employee::new("emp-3", "Robert", "Williams"),
            Employee::new("emp-4", "Patricia", "Brown"),
        ];

        let rows: [(usize, i64, &str, (i32, u32, u32)); 14] = [
            (0, 2_450, "Blue Bottle Coffee", (2024, 3, 1)),
            (1, 129_900, "Apple Store", (2024, 3, 2)),
            (2, 8_735, "Uber", (2024, 3, 2)),
            (0, 45_000, "Delta Air Lines", (2024, 3, 4)),
            (3, 1_999, "Notion", (2024, 3, 5)),
            (1, 6_420, "Whole Foods", (2024, 3, 6)),
            (2, 21_500, "Marriott", (2024, 3, 7)),
            (0, 3_100, "Sweetgreen", (2024, 3, 8)),
            (3, 54_000, "AWS", (2024, 3, 9)),
            (1, 1_250, "Lyft", (2024, 3, 11)),
            (2, 9_999, "Staples", (2024, 3, 12)),
            (3, 4_800, "Zoom", (2024, 3, 13)),
            (0, 17_345, "Best Buy", (2024, 3, 14)),
            (1, 2_275, "Chipotle", (2024, 3, 15)),
        ];

        let transactions = rows
            .iter()
            .enumerate()
            .filter_map(|(index, (employee, cents, merchant, (y, m, d)))| {
                Some(Transaction {
                    id: format!("tx-{:03}", index + 1),
                    amount: Decimal::new(*cents, 2),
                    employee: employees[*employee].clone(),
                    merchant: merchant.to_string(),
                    date: NaiveDate::from_ymd_opt(*y, *m, *d)?,
                    approved: false,
                })
            })
            .collect();

        Self { employees, transactions }
    }
}

/// `Transport` backed by an in-memory `Dataset`
pub struct InMemoryTransport {
    dataset: RwLock<Dataset>,
    per_page: usize,
    latency: Duration,
    endpoint_latency: HashMap<Endpoint, Duration>,
    failures: Mutex<HashMap<Endpoint, VecDeque<TransportError>>>,
    requests: Mutex<HashMap<Endpoint, usize>>,
}

impl InMemoryTransport {
    pub const DEFAULT_PER_PAGE: usize = 5;

    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset: RwLock::new(dataset),
            per_page: Self::DEFAULT_PER_PAGE,
            latency: Duration::ZERO,
            endpoint_latency: HashMap::new(),
            failures: Mutex::new(HashMap::new()),
            requests: Mutex::new(HashMap::new()),
        }
    }

    /// Set the page size of the paginated listing (at least 1)
    pub fn with_per_page(mut self, per_page: usize) -> Self {
        self.per_page = per_page.max(1);
        self
    }

    /// Set the latency applied to every endpoint
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Override the latency of one endpoint
    pub fn with_endpoint_latency(mut self, endpoint: Endpoint, latency: Duration) -> Self {
        self.endpoint_latency.insert(endpoint, latency);
        self
    }

    /// Make the next request to `endpoint` fail with `error`
    pub async fn fail_next(&self, endpoint: Endpoint, error: TransportError) {
        self.failures.lock().await.entry(endpoint).or_default().push_back(error);
    }

    /// Number of requests received for `endpoint`, failed ones included
    pub async fn request_count(&self, endpoint: Endpoint) -> usize {
        self.requests.lock().await.get(&endpoint).copied().unwrap_or(0)
    }

    /// Total number of requests received
    pub async fn total_requests(&self) -> usize {
        self.requests.lock().await.values().sum()
    }

    /// Snapshot of the served data
    pub async fn dataset(&self) -> Dataset {
        self.dataset.read().await.clone()
    }

    fn latency_for(&self, endpoint: Endpoint) -> Duration {
        self.endpoint_latency.get(&endpoint).copied().unwrap_or(self.latency)
    }

    async fn serve(&self, endpoint: Endpoint, params: Option<Value>) -> Result<Value, TransportError> {
        match endpoint {
            Endpoint::Employees => {
                let dataset = self.dataset.read().await;
                encode(endpoint, &dataset.employees)
            }
            Endpoint::TransactionsForAllEmployees => {
                let PageParams { page } = decode(endpoint, params)?;
                let dataset = self.dataset.read().await;
                let page = paginate(endpoint, &dataset.transactions, page, self.per_page)?;
                encode(endpoint, &page)
            }
            Endpoint::TransactionsByEmployee => {
                let EmployeeParams { employee_id } = decode(endpoint, params)?;
                if employee_id.is_empty() {
                    return Err(TransportError::InvalidParams {
                        endpoint,
                        message: "Employee id cannot be empty".to_string(),
                    });
                }
                let dataset = self.dataset.read().await;
                let transactions: Vec<&Transaction> = dataset
                    .transactions
                    .iter()
                    .filter(|tx| tx.employee_id() == employee_id)
                    .collect();
                encode(endpoint, &transactions)
            }
            Endpoint::AllTransactions => {
                let dataset = self.dataset.read().await;
                encode(endpoint, &dataset.transactions)
            }
            Endpoint::SetTransactionApproval => {
                let ApprovalParams { transaction_id, value } = decode(endpoint, params)?;
                let mut dataset = self.dataset.write().await;
                let transaction = dataset
                    .transactions
                    .iter_mut()
                    .find(|tx| tx.id == transaction_id)
                    .ok_or_else(|| TransportError::Server {
                        endpoint,
                        message: format!("Invalid transaction to approve: {}", transaction_id),
                    })?;
                transaction.approved = value;
                Ok(Value::Null)
            }
        }
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn retrieve(&self, endpoint: Endpoint, params: Option<Value>) -> Result<Value, TransportError> {
        *self.requests.lock().await.entry(endpoint).or_insert(0) += 1;

        let latency = self.latency_for(endpoint);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let injected = self
            .failures
            .lock()
            .await
            .get_mut(&endpoint)
            .and_then(|queue| queue.pop_front());
        if let Some(error) = injected {
            log::debug!("injected failure on {}: {}", endpoint, error);
            return Err(error);
        }

        self.serve(endpoint, params).await
    }
}

/// Slice one 1-based page out of `items`
fn paginate<T: Clone>(
    endpoint: Endpoint,
    items: &[T],
    page: u32,
    per_page: usize,
) -> Result<Page<T>, TransportError> {
    if page == 0 {
        return Err(TransportError::InvalidParams {
            endpoint,
            message: "Pages start at 1".to_string(),
        });
    }

    let start = (page as usize - 1) * per_page;
    if start >= items.len() && page > 1 {
        return Err(TransportError::InvalidParams {
            endpoint,
            message: format!("Page {} is out of range", page),
        });
    }

    let end = (start + per_page).min(items.len());
    let next_page = if end < items.len() { Some(page + 1) } else { None };
    Ok(Page::new(items[start.min(end)..end].to_vec(), next_page))
}

fn decode<P: DeserializeOwned>(endpoint: Endpoint, params: Option<Value>) -> Result<P, TransportError> {
    let params = params.ok_or_else(|| TransportError::InvalidParams {
        endpoint,
        message: "Missing parameters".to_string(),
    })?;
    serde_json::from_value(params).map_err(|e| TransportError::InvalidParams {
        endpoint,
        message: e.to_string(),
    })
}

fn encode<T: Serialize + ?Sized>(endpoint: Endpoint, value: &T) -> Result<Value, TransportError> {
    serde_json::to_value(value).map_err(|e| TransportError::Server {
        endpoint,
        message: e.to_string(),
    })
}
