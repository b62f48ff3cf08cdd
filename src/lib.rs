//! Quash, a small POSIX command interpreter.
//!
//! The shell reads one command per line, resolves the program through a
//! colon-separated search path, and runs it as a child process, optionally
//! connected through a single pipe, with optional `<file`/`>file`
//! redirection, and optionally detached as a background job. Background
//! jobs live in a fixed-capacity table ([`jobs::JobTable`]) and are
//! collected asynchronously by a termination watcher ([`reaper`]) driven
//! by `SIGCHLD`.
//!
//! The main entry point is [`Interpreter`], which owns the read-eval loop
//! and the dispatch between builtins and the process engine.

mod builtin;
pub mod env;
mod external;
mod interpreter;
pub mod jobs;
mod parser;
mod pipeline;
pub mod reaper;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API.
pub use interpreter::Interpreter;
