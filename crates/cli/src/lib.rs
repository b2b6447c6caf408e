//! Binary support library for the `vbx` command.

pub mod cli;
pub mod commands;
pub mod logging;
