mod args;
mod sub_command;

pub use args::{Cli, OutputFormat};
pub use sub_command::Commands;
