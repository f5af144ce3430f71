//! Support desk agent HTTP server.
//! Run with: cargo run --bin support-desk-server

use std::process::ExitCode;

use support_desk_agent::start_support_desk;

fn main() -> ExitCode {
    start_support_desk::run()
}
