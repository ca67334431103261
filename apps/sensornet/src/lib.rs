//! # Sensornet Application Library
//!
//! HTTP API, CLI and configuration layered over [`sensornet_core`].

pub mod api;
pub mod cli;
pub mod config;
