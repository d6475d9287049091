// src/lib.rs

pub mod auth;
pub mod config;
pub mod eventbus;
pub mod mirror;
pub mod notify;
pub mod panels;
pub mod patch;
pub mod retry;
pub mod selector;
pub mod session;
pub mod store;
pub mod test_utils;
pub mod views;

pub use config::DashboardConfig;
pub use ottonrent_common::error::Error;
pub use panels::{Panel, PanelOptions, PanelStatus};
pub use selector::ServiceSelector;
