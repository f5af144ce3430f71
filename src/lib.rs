//! Support-desk conversational assistant: thread store, orchestrator, ticketing tools
//! and the HTTP surface serving them.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::print_stdout)]
#![warn(missing_docs)]
#![warn(unused_imports)]
#![warn(unused_must_use)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

/// Orchestration: turns, tools, request protocol, citations.
pub mod agent;
/// Runtime configuration.
pub mod config;
/// Zoho Desk ticketing client.
pub mod desk;
/// Knowledge-base file management.
pub mod knowledge;
/// Text generation through the OpenAI Responses API.
pub mod llm;
/// HTTP server and API routes.
#[allow(clippy::missing_errors_doc, clippy::unused_async)]
pub mod server;
/// Entry helpers to start the support-desk server.
pub mod start_support_desk;
/// In-memory conversation store.
pub mod store;
/// Widget tree model and builders.
pub mod widgets;
