//! WhaleMind: rule-based wallet behavior intelligence. Classifies a
//! wallet's transfer history into behavioral verdicts for AI agents, with
//! an HTTP API, Postgres-backed caching, and a batch precompute runner.

pub mod api;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod db;
pub mod fetch;
pub mod precompute;
