//! HTTP request handlers organized by domain

pub mod executions;
pub mod health;
pub mod jobs;
pub mod stats;
