//! Unit and behavioural tests for the daemon crate.

mod poll_loop;
mod support;
