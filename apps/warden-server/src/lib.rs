#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Reference server wiring the Warden layers into an axum router.

pub mod app;
pub mod config;
