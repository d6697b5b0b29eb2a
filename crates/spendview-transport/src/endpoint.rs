//! Logical endpoints and their request parameters

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Logical endpoint consumed by the view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Endpoint {
    /// Employee roster, no params
    Employees,
    /// Unfiltered listing, paginated by `PageParams`
    TransactionsForAllEmployees,
    /// One employee's transactions, `EmployeeParams`
    TransactionsByEmployee,
    /// Unfiltered listing in one piece
    AllTransactions,
    /// Approval mutation, `ApprovalParams`
    SetTransactionApproval,
}

impl Endpoint {
    pub const ALL: [Endpoint; 5] = [
        Endpoint::Employees,
        Endpoint::TransactionsForAllEmployees,
        Endpoint::TransactionsByEmployee,
        Endpoint::AllTransactions,
        Endpoint::SetTransactionApproval,
    ];

    /// Endpoints whose cached responses contain transactions
    pub const TRANSACTION_LISTINGS: [Endpoint; 3] = [
        Endpoint::TransactionsForAllEmployees,
        Endpoint::TransactionsByEmployee,
        Endpoint::AllTransactions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Employees => "employees",
            Endpoint::TransactionsForAllEmployees => "transactionsForAllEmployees",
            Endpoint::TransactionsByEmployee => "transactionsByEmployee",
            Endpoint::AllTransactions => "allTransactions",
            Endpoint::SetTransactionApproval => "setTransactionApproval",
        }
    }

    /// Mutations must never be served from a cache
    pub fn is_mutation(&self) -> bool {
        matches!(self, Endpoint::SetTransactionApproval)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Endpoint {
    type Err = TransportError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Endpoint::ALL
            .iter()
            .find(|endpoint| endpoint.as_str() == s)
            .copied()
            .ok_or_else(|| TransportError::UnknownEndpoint { name: s.to_string() })
    }
}

/// `{ page }` for the paginated listing (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageParams {
    pub page: u32,
}

/// `{ employeeId }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeParams {
    pub employee_id: String,
}

/// `{ transactionId, value }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalParams {
    pub transaction_id: String,
    pub value: bool,
}
