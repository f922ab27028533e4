//! # Vulnerability Detection
//!
//! Train and evaluate binary vulnerability classifiers over tokenized source functions.
#![forbid(unsafe_code)]

/// Models
pub mod models;

/// Pipelines
pub mod pipelines;

/// Datasets
pub mod datasets;

/// Utilities
pub mod utils;

/// Run settings
pub mod settings;

/// Compute backends
pub mod backend;

/// Error macros
#[macro_use]
extern crate anyhow;
