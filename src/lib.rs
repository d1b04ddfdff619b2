// src/lib.rs

//! Unified Crawler Library
//!
//! Collects recent posts from FMKorea, DCInside and TheQoo boards through a
//! WebDriver-controlled browser, searches YouTube with caption retrieval, and
//! exports the results to spreadsheets behind a signed-license check.

pub mod browser;
pub mod config;
pub mod error;
pub mod export;
pub mod license;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod utils;
