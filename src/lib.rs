//! repo-scout: discovery of candidate repositories for metrics collection
//!
//! Walks a GitHub repository search, filters each result through a chain of
//! contributor, activity, commit-volume and file-count checks, and
//! checkpoints every accepted candidate to a JSON file.

pub mod app;
pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod discovery;
pub mod display;
pub mod github;
pub mod logging;
pub mod summary;
