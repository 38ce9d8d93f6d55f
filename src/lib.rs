//! journal-sync - bidirectional sync between a Markdown tree and journal records
//!
//! This crate provides the core functionality for the `jsync` CLI tool.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - Data types (disk tree, folders and records, unified tree, actions)
//! - [`sync`] - Scanners, merge engine, planner, and executors
//! - [`store`] - File store, record store, and codec seams with concrete adapters
//! - [`storage`] - SQLite database layer for folders and records
//! - [`config`] - Configuration management
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod storage;
pub mod store;
pub mod sync;

pub use error::{Error, Result};
