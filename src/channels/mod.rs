//! User-facing front-ends.

pub mod repl;

pub use repl::{ReplCommand, ReplSession, run_repl};
