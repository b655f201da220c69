//! `scholaris-api`: the HTTP surface of the school platform.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
