//! View orchestration: state snapshot, state machine and async driver

pub mod controller;
pub mod machine;
pub mod state;

pub use controller::ViewController;
pub use machine::{Command, Completion, Step, Ticket, UserAction, ViewEvent, ViewMachine};
pub use state::{ScopedTransactions, ViewPhase, ViewState};
