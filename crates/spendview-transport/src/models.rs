//! Wire models shared by the transport and the view core

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Employee as returned by the `employees` endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    /// Unique, non-empty identifier (empty only for the sentinel)
    pub id: String,
    pub first_name: String,
    pub last_name: String,
}

impl Employee {
    /// Identifier of the "no filter" sentinel
    pub const ALL_ID: &'static str = "";

    pub fn new(id: impl Into<String>, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// The synthetic "All Employees" entry of the filter control
    pub fn all() -> Self {
        Self::new(Self::ALL_ID, "All", "Employees")
    }

    /// Check if this is the sentinel entry
    pub fn is_all(&self) -> bool {
        self.id == Self::ALL_ID
    }

    /// Display label, "First Last"
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A single card transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub amount: Decimal,
    /// The employee the transaction is attributed to
    pub employee: Employee,
    pub merchant: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub approved: bool,
}

impl Transaction {
    pub fn employee_id(&self) -> &str {
        &self.employee.id
    }
}

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    /// Next page to request; `None` once the listing is exhausted
    #[serde(rename = "nextPage")]
    pub next_page: Option<u32>,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, next_page: Option<u32>) -> Self {
        Self { data, next_page }
    }

    pub fn is_last(&self) -> bool {
        self.next_page.is_none()
    }
}
