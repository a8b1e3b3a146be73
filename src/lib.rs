//! Timelapse - FFmpeg time-lapse web service
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod server;
pub mod service;
pub mod staging;
