//! CSV command scripts in, account states out.

pub mod account_writer;
pub mod command;
pub mod command_reader;
