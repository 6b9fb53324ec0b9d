#![warn(missing_docs)]
//! GitScope is a monitoring tool that polls GitHub search for configured
//! keywords, tracks repository star growth over time and sends Telegram
//! alerts when a repository starts trending.

pub mod config;
pub mod github;
pub mod http_client;
pub mod models;
pub mod monitor;
pub mod notification;
pub mod scheduler;
pub mod state;
pub mod test_helpers;
