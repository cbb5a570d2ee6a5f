//! rmqcat CLI - command-line client for AMQP 0-9-1 brokers.
//!
//! - `rmqcat consume` - Stream a queue to stdout or a file (kcat -C style)
//! - `rmqcat publish` - Send messages from arguments or stdin (kcat -P style)
//! - `rmqcat purge` - Drop all ready messages from a queue

mod args;
pub mod commands;

pub use args::{Cli, Commands, ConsumeArgs, GlobalArgs, PublishArgs, PurgeArgs};
