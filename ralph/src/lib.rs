//! Self-restarting agent loop ("Ralph Loop").
//!
//! Given an instruction and an optional completion promise, the loop relaunches
//! an external agent with the same instruction every time the agent's turn
//! ends, until the promise shows up in the agent's output, the iteration
//! budget runs out, or the loop is cancelled.
//!
//! - **[`core`]**: Pure, deterministic logic (loop record, completion
//!   evaluation, output tracking). No I/O.
//! - **[`io`]**: Side effects (state file, config file, process launch,
//!   reply rendering).
//!
//! [`controller`] owns every state transition; [`tools`] and [`session`]
//! expose it to a host runtime.

pub mod controller;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tools;
