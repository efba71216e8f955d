//! Browsing session: the selection state machine and its async driver

mod coordinator;
mod driver;

pub use coordinator::{
    Field, Request, RequestKey, Response, SelectionCoordinator, SelectionState, Slot, Ticket,
};
pub use driver::{execute, Session};
