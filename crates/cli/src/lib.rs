//! Shellform CLI
//!
//! Host for the shell_script provider: reads resource definitions, keeps a
//! state file, and drives refresh, plan, and apply.

pub mod commands;
pub mod output;
pub mod workspace;
