//! gtd-triage library
//!
//! Prioritization, auto-batching and dependency suggestions for GTD-style
//! task lists, with a SQLite-backed task repository.

pub mod cli;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod format;
pub mod logging;
pub mod repository;
pub mod service;
pub mod types;
