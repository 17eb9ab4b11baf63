//! CLI command handlers, one file per command.

mod config;
mod probe;
mod upload;

pub use config::run_config;
pub use probe::run_probe;
pub use upload::run_upload;

#[cfg(test)]
pub(crate) use upload::parse_header;
