// src/lib.rs

//! Coverage admin review desk library
//!
//! Loads country coverage submissions from the dashboard API, filters them,
//! runs approve/reject/delete reviews and exports the filtered view as CSV.

pub mod api;
pub mod auth;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;
