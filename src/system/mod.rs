//! 系统级功能

pub mod logging;
