//! Command line interface module
//!
//! Argument parsing and the plain-text runner used by the binary. The
//! runner only consumes the library's result stream.

pub mod args;
pub mod runner;

pub use args::Args;
pub use runner::Runner;
