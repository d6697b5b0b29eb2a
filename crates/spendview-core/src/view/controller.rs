//! Async driver for the view machine
//!
//! Runs every command the machine issues as a tokio task against the
//! loaders and feeds the completions back through an mpsc queue, one at a
//! time, in arrival order.

use serde_json::Value;
use spendview_transport::{ApprovalParams, Endpoint};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::cache::CacheMetrics;
use crate::error::{CoreResult, DefaultErrorLogger, ErrorContext, ErrorLogger};
use crate::loaders::Loaders;
use crate::view::machine::{Command, Completion, Step, Ticket, UserAction, ViewEvent, ViewMachine};
use crate::view::state::ViewState;

pub struct ViewController {
    machine: ViewMachine,
    loaders: Loaders,
    sender: mpsc::UnboundedSender<ViewEvent>,
    receiver: mpsc::UnboundedReceiver<ViewEvent>,
    /// Resolutions not yet collected with `take_outcome`
    outcomes: HashMap<Ticket, CoreResult<()>>,
    /// Action names of unresolved tickets, for error reports
    actions: HashMap<Ticket, &'static str>,
    logger: Arc<dyn ErrorLogger>,
}

impl ViewController {
    pub fn new(loaders: Loaders) -> Self {
        Self::with_logger(loaders, Arc::new(DefaultErrorLogger))
    }

    pub fn with_logger(loaders: Loaders, logger: Arc<dyn ErrorLogger>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            machine: ViewMachine::new(),
            loaders,
            sender,
            receiver,
            outcomes: HashMap::new(),
            actions: HashMap::new(),
            logger,
        }
    }

    /// Apply a user action and start its commands without waiting
    pub fn submit(&mut self, action: UserAction) -> Ticket {
        let name = action.name();
        log::debug!("action {}: {:?}", name, action);
        let step = self.machine.apply(ViewEvent::User(action));
        let ticket = step.ticket.unwrap_or_default();
        self.actions.insert(ticket, name);
        self.dispatch(step);
        ticket
    }

    /// Apply a user action and wait until it resolves
    pub async fn perform(&mut self, action: UserAction) -> CoreResult<()> {
        let ticket = self.submit(action);
        loop {
            if let Some(result) = self.take_outcome(ticket) {
                return result;
            }
            if !self.process_next().await {
                log::warn!("action {} left unresolved with nothing outstanding", ticket);
                return Ok(());
            }
        }
    }

    /// Apply the next completion. Returns false when nothing is outstanding.
    pub async fn process_next(&mut self) -> bool {
        if self.machine.outstanding() == 0 {
            return false;
        }
        match self.receiver.recv().await {
            Some(event) => {
                let step = self.machine.apply(event);
                self.dispatch(step);
                true
            }
            None => false,
        }
    }

    /// Apply completions until no command is outstanding
    pub async fn settle(&mut self) {
        while self.process_next().await {}
    }

    pub fn take_outcome(&mut self, ticket: Ticket) -> Option<CoreResult<()>> {
        self.outcomes.remove(&ticket)
    }

    pub fn state(&self) -> &ViewState {
        self.machine.state()
    }

    pub fn loaders(&self) -> &Loaders {
        &self.loaders
    }

    pub async fn metrics(&self) -> CacheMetrics {
        self.loaders.fetcher.metrics().await
    }

    fn dispatch(&mut self, step: Step) {
        for command in step.commands {
            let loaders = self.loaders.clone();
            let sender = self.sender.clone();
            tokio::spawn(async move {
                let result = execute(&command, &loaders).await;
                if sender.send(ViewEvent::Completed { command, result }).is_err() {
                    log::debug!("view controller dropped before completion arrived");
                }
            });
        }

        if let Some((ticket, result)) = step.resolved {
            let operation = self.actions.remove(&ticket).unwrap_or("unknown");
            if let Err(error) = &result {
                let context = ErrorContext::new(operation.to_string())
                    .with_ticket(ticket)
                    .with_data("epoch", serde_json::json!(self.machine.epoch()))
                    .with_data("outstanding", serde_json::json!(self.machine.outstanding()));
                self.logger.log_error(error, &context);
            }
            self.outcomes.insert(ticket, result);
        }
    }
}

/// Run one command against the loaders
async fn execute(command: &Command, loaders: &Loaders) -> CoreResult<Completion> {
    match command {
        Command::LoadDirectory { refresh, .. } => {
            if *refresh {
                let dropped = loaders.fetcher.clear().await;
                loaders.directory.invalidate().await;
                loaders.scoped.invalidate().await;
                log::info!("refresh dropped {} cached responses", dropped);
            }
            let employees = loaders.directory.fetch_all().await?;
            Ok(Completion::Directory(employees))
        }
        Command::LoadFirstPage { .. } => {
            loaders.pager.restart().await;
            let page = loaders.pager.fetch_all().await?;
            Ok(Completion::FirstPage(page))
        }
        Command::LoadNextPage { .. } => {
            let page = loaders.pager.fetch_all().await?;
            Ok(Completion::NextPage(page))
        }
        Command::LoadEmployee { employee_id, .. } => {
            let transactions = loaders.scoped.fetch_by_id(employee_id).await?;
            Ok(Completion::Employee {
                employee_id: employee_id.clone(),
                transactions,
            })
        }
        Command::SetApproval {
            transaction_id,
            approved,
            ..
        } => {
            let params = ApprovalParams {
                transaction_id: transaction_id.clone(),
                value: *approved,
            };
            loaders
                .fetcher
                .fetch_without_cache::<Value, _>(Endpoint::SetTransactionApproval, Some(&params))
                .await?;
            for endpoint in Endpoint::TRANSACTION_LISTINGS {
                loaders.fetcher.invalidate_endpoint(endpoint).await;
            }
            log::info!("transaction {} approval set to {}", transaction_id, approved);
            Ok(Completion::Approval {
                transaction_id: transaction_id.clone(),
                approved: *approved,
            })
        }
    }
}
