//! Service layer for the review desk.
//!
//! This module contains the business logic for:
//! - Loading stats and submissions (`DataFetcher`)
//! - Filtering the submission list (`filter::visible`)
//! - Running review actions (`ReviewController`)
//! - Exporting the filtered view (`export::write_csv`)

pub mod export;
pub mod fetcher;
pub mod filter;
pub mod prompt;
pub mod review;

#[cfg(test)]
pub(crate) mod testing;

pub use fetcher::{Dashboard, DataFetcher};
pub use filter::{DateFilter, StatusFilter, SubmissionFilter, visible};
pub use prompt::{PresetPrompt, ReviewPrompt, TerminalPrompt};
pub use review::{ActionOutcome, ReviewController};
