//! Muninn Bins - runnable entry points for the monitoring engine

pub mod common;
