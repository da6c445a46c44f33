//! Feature voting: a vote ledger with one vote per user per feature, a cached
//! per-feature vote count kept equal to it, and a stable popularity ranking.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod service;
