pub mod config;
pub mod logging;

pub mod connect_check;
pub mod control;
pub mod error;
pub mod metrics;
pub mod network_status;
pub mod outcome;
pub mod report;
pub mod request;
pub mod retry;
pub mod status;
pub mod transport;

pub use error::UplinkError;
