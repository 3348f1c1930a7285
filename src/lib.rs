//! A small interactive command interpreter with raw-mode line editing.
//!
//! This crate provides the building blocks of a minimal shell: a
//! character-at-a-time input reader with tab completion, a quoting-aware
//! tokenizer, a redirection-aware command builder, and a dispatcher that
//! routes parsed commands to in-process builtins or to external programs
//! discovered on the search path. It is intentionally small and easy to
//! read.
//!
//! The main entry point is [`Interpreter`], which owns the session
//! environment and drives the prompt/read/dispatch loop. The public modules
//! [`command`] and [`env`] expose the traits and types commands are built
//! from.

mod builtin;
pub mod command;
mod completion;
pub mod env;
mod external;
mod interpreter;
mod lexer;
mod parser;
mod reader;
mod terminal;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API.
pub use interpreter::Interpreter;
