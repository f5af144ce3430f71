//! Ticketing system collaborator.
//!
//! - `auth`: refresh-token OAuth with a cached access token
//! - `client`: the [`TicketDesk`] trait and its HTTP implementation
//! - `ticket`: field extraction and formatting for ticket cards

pub mod auth;
pub mod client;
pub mod errors;
pub mod ticket;

pub use auth::DeskAuth;
pub use client::{DeskClient, DeskFuture, TicketDesk, TicketFilter, first_ticket};
pub use errors::{DeskError, DeskResult};
pub use ticket::{TicketSummary, tool_view};
