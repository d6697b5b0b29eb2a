//! View state snapshot and the values derived from it

use serde::Serialize;
use spendview_transport::{Employee, Page, Transaction};

/// Last result of the employee-scoped loader, tagged with its employee
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopedTransactions {
    pub employee_id: String,
    pub transactions: Vec<Transaction>,
}

/// Where the view is, derived from `ViewState`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViewPhase {
    Initial,
    UnfilteredLoading,
    UnfilteredReady,
    FilteredLoading,
    FilteredReady,
}

/// Read-only snapshot handed to presentation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewState {
    /// `None` until the directory has loaded
    pub employees: Option<Vec<Employee>>,
    pub selected_employee: Option<Employee>,
    /// Pages applied in the current unfiltered cycle, in fetch order
    pub pages: Vec<Page<Transaction>>,
    pub employee_transactions: Option<ScopedTransactions>,
    pub has_more_data: bool,
    pub is_loading: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            employees: None,
            selected_employee: None,
            pages: Vec::new(),
            employee_transactions: None,
            has_more_data: true,
            is_loading: false,
        }
    }
}

impl ViewState {
    /// The list to render.
    ///
    /// With a selection this is the scoped result for exactly that
    /// employee (empty until it arrives); without one it is every applied
    /// page concatenated.
    pub fn visible_transactions(&self) -> Vec<Transaction> {
        match &self.selected_employee {
            Some(employee) => self
                .employee_transactions
                .as_ref()
                .filter(|scoped| scoped.employee_id == employee.id)
                .map(|scoped| scoped.transactions.clone())
                .unwrap_or_default(),
            None => self
                .pages
                .iter()
                .flat_map(|page| page.data.iter().cloned())
                .collect(),
        }
    }

    pub fn phase(&self) -> ViewPhase {
        match (&self.selected_employee, self.is_loading) {
            (Some(_), true) => ViewPhase::FilteredLoading,
            (Some(_), false) => ViewPhase::FilteredReady,
            (None, true) => ViewPhase::UnfilteredLoading,
            (None, false) if self.employees.is_none() && self.pages.is_empty() => ViewPhase::Initial,
            (None, false) => ViewPhase::UnfilteredReady,
        }
    }

    /// Entries of the filter control: the "all" sentinel, then the roster
    pub fn filter_items(&self) -> Vec<Employee> {
        match &self.employees {
            Some(employees) => std::iter::once(Employee::all())
                .chain(employees.iter().cloned())
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn show_view_more(&self) -> bool {
        self.selected_employee.is_none() && self.has_more_data && !self.pages.is_empty()
    }

    /// Look up a directory entry by id
    pub fn employee(&self, id: &str) -> Option<&Employee> {
        self.employees.as_ref()?.iter().find(|employee| employee.id == id)
    }

    /// True when the view holds a transaction with this id
    pub fn holds_transaction(&self, id: &str) -> bool {
        let in_pages = self.pages.iter().any(|page| page.data.iter().any(|tx| tx.id == id));
        let in_scoped = self
            .employee_transactions
            .as_ref()
            .map_or(false, |scoped| scoped.transactions.iter().any(|tx| tx.id == id));
        in_pages || in_scoped
    }

    /// Patch the approval flag wherever the transaction is held
    pub(crate) fn set_approved(&mut self, id: &str, approved: bool) -> usize {
        let scoped = self
            .employee_transactions
            .iter_mut()
            .flat_map(|scoped| scoped.transactions.iter_mut());
        let mut patched = 0;
        for tx in self.pages.iter_mut().flat_map(|page| page.data.iter_mut()).chain(scoped) {
            if tx.id == id {
                tx.approved = approved;
                patched += 1;
            }
        }
        patched
    }
}
