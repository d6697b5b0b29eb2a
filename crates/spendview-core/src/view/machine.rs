//! View orchestration as an explicit state machine
//!
//! `ViewMachine::apply` takes one event (a user action or the completion
//! of a command it issued earlier) and returns the commands to run next.
//! It never performs I/O, so any interleaving of completions can be fed to
//! it directly.
//!
//! Selecting, clearing and refreshing bump the epoch. Every command carries
//! the epoch it was issued in; a completion from an older epoch is
//! discarded and its action resolves with `StaleResponse`. Approvals are
//! the exception: they are applied whatever the epoch.

use spendview_transport::{Employee, Page, Transaction};
use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::loaders::ALL_EMPLOYEES;
use crate::view::state::{ScopedTransactions, ViewState};

/// Identifies one user action until it resolves
pub type Ticket = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    /// Initial load, a no-op once anything has loaded
    Start,
    /// Filter by employee id; empty or `"all"` clears the filter
    SelectEmployee(String),
    ClearFilter,
    LoadMore,
    /// Drop every cached response and reload from scratch
    Refresh,
    SetApproval { transaction_id: String, approved: bool },
}

impl UserAction {
    pub fn name(&self) -> &'static str {
        match self {
            UserAction::Start => "start",
            UserAction::SelectEmployee(_) => "select_employee",
            UserAction::ClearFilter => "clear_filter",
            UserAction::LoadMore => "load_more",
            UserAction::Refresh => "refresh",
            UserAction::SetApproval { .. } => "set_approval",
        }
    }
}

/// Work the controller runs against the loaders
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Load the directory; a full unfiltered cycle continues with the first page
    LoadDirectory { ticket: Ticket, epoch: u64, refresh: bool },
    LoadFirstPage { ticket: Ticket, epoch: u64 },
    LoadNextPage { ticket: Ticket, epoch: u64 },
    LoadEmployee { ticket: Ticket, epoch: u64, employee_id: String },
    SetApproval { ticket: Ticket, epoch: u64, transaction_id: String, approved: bool },
}

impl Command {
    pub fn ticket(&self) -> Ticket {
        match self {
            Command::LoadDirectory { ticket, .. }
            | Command::LoadFirstPage { ticket, .. }
            | Command::LoadNextPage { ticket, .. }
            | Command::LoadEmployee { ticket, .. }
            | Command::SetApproval { ticket, .. } => *ticket,
        }
    }

    pub fn epoch(&self) -> u64 {
        match self {
            Command::LoadDirectory { epoch, .. }
            | Command::LoadFirstPage { epoch, .. }
            | Command::LoadNextPage { epoch, .. }
            | Command::LoadEmployee { epoch, .. }
            | Command::SetApproval { epoch, .. } => *epoch,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Command::LoadDirectory { refresh: true, .. } => "reload directory".to_string(),
            Command::LoadDirectory { .. } => "load directory".to_string(),
            Command::LoadFirstPage { .. } => "load first page".to_string(),
            Command::LoadNextPage { .. } => "load next page".to_string(),
            Command::LoadEmployee { employee_id, .. } => format!("load transactions of {}", employee_id),
            Command::SetApproval { transaction_id, .. } => format!("set approval of {}", transaction_id),
        }
    }
}

/// Successful outcome of a command
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Directory(Vec<Employee>),
    /// `None` when the pager had nothing left to fetch
    FirstPage(Option<Page<Transaction>>),
    NextPage(Option<Page<Transaction>>),
    Employee { employee_id: String, transactions: Vec<Transaction> },
    Approval { transaction_id: String, approved: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    User(UserAction),
    Completed { command: Command, result: CoreResult<Completion> },
}

/// What one `apply` produced
#[derive(Debug, Default, PartialEq)]
pub struct Step {
    /// Ticket assigned to a user action
    pub ticket: Option<Ticket>,
    pub commands: Vec<Command>,
    /// An action that finished with this event
    pub resolved: Option<(Ticket, CoreResult<()>)>,
}

impl Step {
    fn issue(ticket: Ticket, command: Command) -> Self {
        Self {
            ticket: Some(ticket),
            commands: vec![command],
            resolved: None,
        }
    }

    fn resolve(ticket: Option<Ticket>, resolved: Ticket, result: CoreResult<()>) -> Self {
        Self {
            ticket,
            commands: Vec::new(),
            resolved: Some((resolved, result)),
        }
    }
}

#[derive(Debug, Default)]
pub struct ViewMachine {
    state: ViewState,
    epoch: u64,
    next_ticket: Ticket,
    outstanding: usize,
    /// Outstanding loads per issuing epoch
    loads: HashMap<u64, usize>,
    /// Outstanding approvals, live whatever the epoch
    approvals: usize,
    /// Action that owns the in-flight page request, if any
    page_request: Option<Ticket>,
}

impl ViewMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Commands issued and not yet completed
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// `is_loading` only counts commands whose result can still be applied;
    /// superseded loads stay in `outstanding` until they report back.
    pub fn apply(&mut self, event: ViewEvent) -> Step {
        let step = match event {
            ViewEvent::User(action) => self.on_action(action),
            ViewEvent::Completed { command, result } => {
                self.untrack(&command);
                self.on_completion(command, result)
            }
        };
        for command in &step.commands {
            self.track(command);
        }
        let live_loads = self.loads.get(&self.epoch).copied().unwrap_or(0);
        self.state.is_loading = live_loads > 0 || self.approvals > 0;
        step
    }

    fn track(&mut self, command: &Command) {
        self.outstanding += 1;
        match command {
            Command::SetApproval { .. } => self.approvals += 1,
            _ => *self.loads.entry(command.epoch()).or_insert(0) += 1,
        }
    }

    fn untrack(&mut self, command: &Command) {
        self.outstanding = self.outstanding.saturating_sub(1);
        match command {
            Command::SetApproval { .. } => self.approvals = self.approvals.saturating_sub(1),
            _ => {
                if let Some(count) = self.loads.get_mut(&command.epoch()) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        self.loads.remove(&command.epoch());
                    }
                }
            }
        }
    }

    fn on_action(&mut self, action: UserAction) -> Step {
        self.next_ticket += 1;
        let ticket = self.next_ticket;

        match action {
            UserAction::Start => {
                if self.state.employees.is_some() || self.outstanding > 0 {
                    return Step::resolve(Some(ticket), ticket, Ok(()));
                }
                self.begin_cycle(ticket, false)
            }
            UserAction::SelectEmployee(id) if id.is_empty() || id == ALL_EMPLOYEES => {
                self.clear_filter(ticket)
            }
            UserAction::SelectEmployee(id) => {
                let Some(employee) = self.state.employee(&id).cloned() else {
                    return Step::resolve(Some(ticket), ticket, Err(CoreError::UnknownEmployee { id }));
                };
                self.epoch += 1;
                self.page_request = None;
                self.state.selected_employee = Some(employee);
                Step::issue(
                    ticket,
                    Command::LoadEmployee {
                        ticket,
                        epoch: self.epoch,
                        employee_id: id,
                    },
                )
            }
            UserAction::ClearFilter => self.clear_filter(ticket),
            UserAction::LoadMore => self.load_more(ticket),
            UserAction::Refresh => {
                self.state.employees = None;
                self.state.employee_transactions = None;
                self.begin_cycle(ticket, true)
            }
            UserAction::SetApproval { transaction_id, approved } => {
                if !self.state.holds_transaction(&transaction_id) {
                    return Step::resolve(
                        Some(ticket),
                        ticket,
                        Err(CoreError::UnknownTransaction { id: transaction_id }),
                    );
                }
                Step::issue(
                    ticket,
                    Command::SetApproval {
                        ticket,
                        epoch: self.epoch,
                        transaction_id,
                        approved,
                    },
                )
            }
        }
    }

    fn clear_filter(&mut self, ticket: Ticket) -> Step {
        self.begin_cycle(ticket, false)
    }

    /// Start a fresh unfiltered cycle: directory, then page 1
    fn begin_cycle(&mut self, ticket: Ticket, refresh: bool) -> Step {
        self.epoch += 1;
        self.state.selected_employee = None;
        self.state.has_more_data = true;
        self.page_request = Some(ticket);
        Step::issue(
            ticket,
            Command::LoadDirectory {
                ticket,
                epoch: self.epoch,
                refresh,
            },
        )
    }

    fn load_more(&mut self, ticket: Ticket) -> Step {
        if let Some(employee) = &self.state.selected_employee {
            let employee_id = employee.id.clone();
            return Step::issue(
                ticket,
                Command::LoadEmployee {
                    ticket,
                    epoch: self.epoch,
                    employee_id,
                },
            );
        }
        if self.page_request.is_some() {
            return Step::resolve(
                Some(ticket),
                ticket,
                Err(CoreError::Busy {
                    operation: "page load".to_string(),
                }),
            );
        }
        if !self.state.has_more_data {
            log::debug!("load more ignored, every page is loaded");
            return Step::resolve(Some(ticket), ticket, Ok(()));
        }

        self.page_request = Some(ticket);
        let command = if self.state.pages.is_empty() {
            Command::LoadFirstPage { ticket, epoch: self.epoch }
        } else {
            Command::LoadNextPage { ticket, epoch: self.epoch }
        };
        Step::issue(ticket, command)
    }

    fn on_completion(&mut self, command: Command, result: CoreResult<Completion>) -> Step {
        let ticket = command.ticket();
        let is_approval = matches!(command, Command::SetApproval { .. });

        if !is_approval && command.epoch() != self.epoch {
            if let Err(error) = &result {
                log::debug!("dropping failed {} from an old epoch: {}", command.describe(), error);
            }
            return Step::resolve(
                None,
                ticket,
                Err(CoreError::StaleResponse {
                    action: command.describe(),
                    issued: command.epoch(),
                    current: self.epoch,
                }),
            );
        }

        let completion = match result {
            Ok(completion) => completion,
            Err(error) => {
                if self.page_request == Some(ticket) {
                    self.page_request = None;
                }
                return Step::resolve(None, ticket, Err(error));
            }
        };

        match completion {
            Completion::Directory(employees) => {
                self.state.employees = Some(employees);
                Step {
                    ticket: None,
                    commands: vec![Command::LoadFirstPage {
                        ticket,
                        epoch: self.epoch,
                    }],
                    resolved: None,
                }
            }
            Completion::FirstPage(page) => {
                self.page_request = None;
                match page {
                    Some(page) => {
                        self.state.has_more_data = !page.is_last();
                        self.state.pages = vec![page];
                    }
                    None => {
                        self.state.has_more_data = false;
                        self.state.pages.clear();
                    }
                }
                Step::resolve(None, ticket, Ok(()))
            }
            Completion::NextPage(page) => {
                self.page_request = None;
                match page {
                    Some(page) => {
                        self.state.has_more_data = !page.is_last();
                        self.state.pages.push(page);
                    }
                    None => self.state.has_more_data = false,
                }
                Step::resolve(None, ticket, Ok(()))
            }
            Completion::Employee {
                employee_id,
                transactions,
            } => {
                self.state.employee_transactions = Some(ScopedTransactions {
                    employee_id,
                    transactions,
                });
                Step::resolve(None, ticket, Ok(()))
            }
            Completion::Approval {
                transaction_id,
                approved,
            } => {
                let patched = self.state.set_approved(&transaction_id, approved);
                log::debug!("approval of {} patched {} entries", transaction_id, patched);
                Step::resolve(None, ticket, Ok(()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::state::ViewPhase;
    use serde_json::json;
    use spendview_transport::{Endpoint, TransportError};

    fn tx(id: &str, employee_id: &str) -> Transaction {
        serde_json::from_value(json!({
            "id": id,
            "amount": "12.50",
            "employee": { "id": employee_id, "firstName": "First", "lastName": "Last" },
            "merchant": "Merchant",
            "date": "2024-03-01"
        }))
        .unwrap()
    }

    fn employees() -> Vec<Employee> {
        vec![Employee::new("1", "James", "Smith"), Employee::new("2", "Mary", "Johnson")]
    }

    fn ids(state: &ViewState) -> Vec<String> {
        state.visible_transactions().into_iter().map(|tx| tx.id).collect()
    }

    fn user(machine: &mut ViewMachine, action: UserAction) -> Step {
        machine.apply(ViewEvent::User(action))
    }

    fn complete(machine: &mut ViewMachine, command: &Command, result: CoreResult<Completion>) -> Step {
        machine.apply(ViewEvent::Completed {
            command: command.clone(),
            result,
        })
    }

    /// Drive Start through directory and page 1 (`[a, b]`, next 2)
    fn started() -> ViewMachine {
        let mut machine = ViewMachine::new();
        let step = user(&mut machine, UserAction::Start);
        let step = complete(&mut machine, &step.commands[0], Ok(Completion::Directory(employees())));
        let page = Page::new(vec![tx("a", "1"), tx("b", "1")], Some(2));
        let step = complete(&mut machine, &step.commands[0], Ok(Completion::FirstPage(Some(page))));
        assert_eq!(step.resolved, Some((1, Ok(()))));
        machine
    }

    #[test]
    fn test_start_loads_directory_then_first_page() {
        let mut machine = ViewMachine::new();
        assert_eq!(machine.state().phase(), ViewPhase::Initial);

        let step = user(&mut machine, UserAction::Start);
        assert_eq!(step.ticket, Some(1));
        assert!(matches!(step.commands[0], Command::LoadDirectory { refresh: false, .. }));
        assert!(machine.state().is_loading);
        assert_eq!(machine.state().phase(), ViewPhase::UnfilteredLoading);

        let step = complete(&mut machine, &step.commands[0], Ok(Completion::Directory(employees())));
        assert!(step.resolved.is_none());
        assert!(matches!(step.commands[0], Command::LoadFirstPage { ticket: 1, .. }));
        assert_eq!(machine.state().filter_items().len(), 3);

        let page = Page::new(vec![tx("a", "1"), tx("b", "1")], Some(2));
        complete(&mut machine, &step.commands[0], Ok(Completion::FirstPage(Some(page))));
        assert_eq!(ids(machine.state()), vec!["a", "b"]);
        assert!(!machine.state().is_loading);
        assert_eq!(machine.state().phase(), ViewPhase::UnfilteredReady);
        assert!(machine.state().show_view_more());
    }

    #[test]
    fn test_start_is_noop_once_loaded() {
        let mut machine = started();
        let step = user(&mut machine, UserAction::Start);
        assert!(step.commands.is_empty());
        assert_eq!(step.resolved, Some((2, Ok(()))));
    }

    #[test]
    fn test_load_more_until_exhausted() {
        let mut machine = started();

        let step = user(&mut machine, UserAction::LoadMore);
        assert!(matches!(step.commands[0], Command::LoadNextPage { .. }));
        let page = Page::new(vec![tx("c", "2")], None);
        complete(&mut machine, &step.commands[0], Ok(Completion::NextPage(Some(page))));

        assert_eq!(ids(machine.state()), vec!["a", "b", "c"]);
        assert!(!machine.state().has_more_data);
        assert!(!machine.state().show_view_more());

        let step = user(&mut machine, UserAction::LoadMore);
        assert!(step.commands.is_empty());
        assert!(matches!(step.resolved, Some((_, Ok(())))));
        assert!(!machine.state().has_more_data);
    }

    #[test]
    fn test_load_more_while_page_outstanding_is_busy() {
        let mut machine = started();
        let first = user(&mut machine, UserAction::LoadMore);
        assert_eq!(first.commands.len(), 1);

        let second = user(&mut machine, UserAction::LoadMore);
        assert!(second.commands.is_empty());
        assert!(matches!(second.resolved, Some((_, Err(CoreError::Busy { .. })))));
    }

    #[test]
    fn test_failed_page_keeps_visible_list() {
        let mut machine = started();
        let step = user(&mut machine, UserAction::LoadMore);
        let error = CoreError::Transport(TransportError::Server {
            endpoint: Endpoint::TransactionsForAllEmployees,
            message: "boom".to_string(),
        });
        let step = complete(&mut machine, &step.commands[0], Err(error.clone()));

        assert_eq!(step.resolved, Some((2, Err(error))));
        assert_eq!(ids(machine.state()), vec!["a", "b"]);
        assert!(!machine.state().is_loading);
        assert!(machine.state().has_more_data);

        let retry = user(&mut machine, UserAction::LoadMore);
        assert!(matches!(retry.commands[0], Command::LoadNextPage { .. }));
    }

    #[test]
    fn test_select_shows_exactly_scoped_result() {
        let mut machine = started();
        let step = user(&mut machine, UserAction::SelectEmployee("1".to_string()));
        let Command::LoadEmployee { employee_id, .. } = &step.commands[0] else {
            panic!("expected an employee load, got {:?}", step.commands);
        };
        assert_eq!(employee_id, "1");
        assert_eq!(machine.state().phase(), ViewPhase::FilteredLoading);
        assert!(ids(machine.state()).is_empty());

        complete(
            &mut machine,
            &step.commands[0],
            Ok(Completion::Employee {
                employee_id: "1".to_string(),
                transactions: vec![tx("a", "1"), tx("d", "1")],
            }),
        );
        assert_eq!(ids(machine.state()), vec!["a", "d"]);
        assert_eq!(machine.state().phase(), ViewPhase::FilteredReady);

        let again = user(&mut machine, UserAction::LoadMore);
        assert!(matches!(&again.commands[0], Command::LoadEmployee { employee_id, .. } if employee_id == "1"));
    }

    #[test]
    fn test_unknown_employee_is_rejected() {
        let mut machine = started();
        let before = machine.state().clone();
        let step = user(&mut machine, UserAction::SelectEmployee("9".to_string()));
        assert!(step.commands.is_empty());
        assert!(matches!(step.resolved, Some((_, Err(CoreError::UnknownEmployee { .. })))));
        assert_eq!(machine.state(), &before);
    }

    #[test]
    fn test_clear_filter_restarts_at_first_page() {
        let mut machine = started();
        let more = user(&mut machine, UserAction::LoadMore);
        complete(
            &mut machine,
            &more.commands[0],
            Ok(Completion::NextPage(Some(Page::new(vec![tx("c", "2")], None)))),
        );
        let select = user(&mut machine, UserAction::SelectEmployee("2".to_string()));
        complete(
            &mut machine,
            &select.commands[0],
            Ok(Completion::Employee {
                employee_id: "2".to_string(),
                transactions: vec![tx("c", "2")],
            }),
        );

        let clear = user(&mut machine, UserAction::SelectEmployee(ALL_EMPLOYEES.to_string()));
        assert!(machine.state().selected_employee.is_none());
        assert!(machine.state().has_more_data);
        assert!(matches!(clear.commands[0], Command::LoadDirectory { .. }));

        let first = complete(&mut machine, &clear.commands[0], Ok(Completion::Directory(employees())));
        assert!(matches!(first.commands[0], Command::LoadFirstPage { .. }));
        complete(
            &mut machine,
            &first.commands[0],
            Ok(Completion::FirstPage(Some(Page::new(vec![tx("a", "1"), tx("b", "1")], Some(2))))),
        );
        assert_eq!(ids(machine.state()), vec!["a", "b"]);
        assert!(machine.state().has_more_data);
    }

    #[test]
    fn test_late_failure_after_clear_changes_nothing() {
        let mut machine = started();
        let select = user(&mut machine, UserAction::SelectEmployee("1".to_string()));
        let clear = user(&mut machine, UserAction::ClearFilter);
        let first = complete(&mut machine, &clear.commands[0], Ok(Completion::Directory(employees())));
        complete(
            &mut machine,
            &first.commands[0],
            Ok(Completion::FirstPage(Some(Page::new(vec![tx("a", "1")], None)))),
        );
        let before = machine.state().clone();

        let error = CoreError::Transport(TransportError::Network {
            endpoint: Endpoint::TransactionsByEmployee,
            message: "reset".to_string(),
        });
        let late = complete(&mut machine, &select.commands[0], Err(error));

        assert!(matches!(late.resolved, Some((2, Err(CoreError::StaleResponse { .. })))));
        assert_eq!(machine.state().pages, before.pages);
        assert_eq!(machine.state().employee_transactions, before.employee_transactions);
        assert!(machine.state().selected_employee.is_none());
        assert!(!machine.state().is_loading);
        assert_eq!(ids(machine.state()), vec!["a"]);
    }

    #[test]
    fn test_page_landing_after_select_is_discarded() {
        let mut machine = started();
        let more = user(&mut machine, UserAction::LoadMore);
        let select = user(&mut machine, UserAction::SelectEmployee("2".to_string()));

        let late = complete(
            &mut machine,
            &more.commands[0],
            Ok(Completion::NextPage(Some(Page::new(vec![tx("c", "2")], None)))),
        );
        assert!(matches!(late.resolved, Some((2, Err(CoreError::StaleResponse { .. })))));
        assert_eq!(machine.state().pages.len(), 1);
        assert!(machine.state().has_more_data);
        assert!(ids(machine.state()).is_empty());

        complete(
            &mut machine,
            &select.commands[0],
            Ok(Completion::Employee {
                employee_id: "2".to_string(),
                transactions: vec![tx("b2", "2")],
            }),
        );
        assert_eq!(ids(machine.state()), vec!["b2"]);
    }

    #[test]
    fn test_load_more_after_select_keeps_selection() {
        let mut machine = started();
        let select = user(&mut machine, UserAction::SelectEmployee("1".to_string()));
        let more = user(&mut machine, UserAction::LoadMore);
        assert!(matches!(&more.commands[0], Command::LoadEmployee { employee_id, .. } if employee_id == "1"));

        let scoped = vec![tx("a", "1"), tx("d", "1")];
        let second = complete(
            &mut machine,
            &more.commands[0],
            Ok(Completion::Employee {
                employee_id: "1".to_string(),
                transactions: scoped.clone(),
            }),
        );
        let first = complete(
            &mut machine,
            &select.commands[0],
            Ok(Completion::Employee {
                employee_id: "1".to_string(),
                transactions: scoped,
            }),
        );

        assert_eq!(second.resolved, Some((3, Ok(()))));
        assert_eq!(first.resolved, Some((2, Ok(()))));
        assert_eq!(ids(machine.state()), vec!["a", "d"]);
        assert_eq!(machine.state().pages.len(), 1);
        assert_eq!(machine.state().selected_employee.as_ref().map(|e| e.id.as_str()), Some("1"));
    }

    #[test]
    fn test_superseded_load_does_not_keep_view_loading() {
        let mut machine = started();
        let select = user(&mut machine, UserAction::SelectEmployee("1".to_string()));
        let clear = user(&mut machine, UserAction::ClearFilter);
        let first = complete(&mut machine, &clear.commands[0], Ok(Completion::Directory(employees())));
        complete(
            &mut machine,
            &first.commands[0],
            Ok(Completion::FirstPage(Some(Page::new(vec![tx("a", "1")], None)))),
        );

        assert_eq!(machine.outstanding(), 1);
        assert!(!machine.state().is_loading);
        assert_eq!(machine.state().phase(), ViewPhase::UnfilteredReady);

        complete(
            &mut machine,
            &select.commands[0],
            Ok(Completion::Employee {
                employee_id: "1".to_string(),
                transactions: vec![],
            }),
        );
        assert_eq!(machine.outstanding(), 0);
        assert!(!machine.state().is_loading);
    }

    #[test]
    fn test_late_success_for_previous_selection_is_discarded() {
        let mut machine = started();
        let first = user(&mut machine, UserAction::SelectEmployee("1".to_string()));
        let second = user(&mut machine, UserAction::SelectEmployee("2".to_string()));

        complete(
            &mut machine,
            &second.commands[0],
            Ok(Completion::Employee {
                employee_id: "2".to_string(),
                transactions: vec![tx("c", "2")],
            }),
        );
        let late = complete(
            &mut machine,
            &first.commands[0],
            Ok(Completion::Employee {
                employee_id: "1".to_string(),
                transactions: vec![tx("a", "1")],
            }),
        );

        assert!(matches!(late.resolved, Some((_, Err(CoreError::StaleResponse { .. })))));
        assert_eq!(ids(machine.state()), vec!["c"]);
    }

    #[test]
    fn test_refresh_forgets_directory() {
        let mut machine = started();
        let step = user(&mut machine, UserAction::Refresh);
        assert!(matches!(step.commands[0], Command::LoadDirectory { refresh: true, .. }));
        assert!(machine.state().employees.is_none());
        assert!(machine.state().filter_items().is_empty());
        assert!(machine.state().is_loading);
    }

    #[test]
    fn test_approval_applies_across_epochs() {
        let mut machine = started();
        let approve = user(
            &mut machine,
            UserAction::SetApproval {
                transaction_id: "b".to_string(),
                approved: true,
            },
        );
        assert!(matches!(approve.commands[0], Command::SetApproval { .. }));
        user(&mut machine, UserAction::SelectEmployee("2".to_string()));

        let done = complete(
            &mut machine,
            &approve.commands[0],
            Ok(Completion::Approval {
                transaction_id: "b".to_string(),
                approved: true,
            }),
        );
        assert!(matches!(done.resolved, Some((_, Ok(())))));
        assert!(machine.state().pages[0].data[1].approved);
    }

    #[test]
    fn test_approval_of_unknown_transaction() {
        let mut machine = started();
        let step = user(
            &mut machine,
            UserAction::SetApproval {
                transaction_id: "zz".to_string(),
                approved: true,
            },
        );
        assert!(step.commands.is_empty());
        assert!(matches!(step.resolved, Some((_, Err(CoreError::UnknownTransaction { .. })))));
    }
}
