//! Library half of the `syntaxfix` binary: `syntaxfix.toml` loading and
//! merging with command-line arguments.

pub mod config;
