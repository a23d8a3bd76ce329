//! Platform services: configuration and background cache housekeeping.

#![allow(dead_code)]

pub mod config;
pub mod maintenance;

pub use config::PlatformConfig;
pub use maintenance::{drain_all, MaintenanceConfig, MaintenanceJob};
