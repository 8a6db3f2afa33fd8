//! Text processing for the campus bot
//!
//! This crate provides the text-level building blocks the turn logic relies on:
//! - **Entity Normalization**: strip serialization artifacts from entity spans
//! - **Folding**: case/accent-insensitive comparison keys and tokens
//! - **Number Recognition**: cardinal numbers in digits or English words
//! - **Date/Time Recognition**: absolute and relative date/time expressions
//! - **Pattern Classifier**: regex-driven intent models behind the
//!   `IntentClassifier` seam, for development and tests
//!
//! # Example
//!
//! ```
//! use campus_bot_text_processing::{normalize_entity, numbers};
//!
//! assert_eq!(normalize_entity(" [\"campus\"] "), "campus");
//! assert_eq!(numbers::first_integer("twenty-one"), Some(21));
//! ```

pub mod datetime;
pub mod fold;
pub mod intent;
pub mod normalizer;
pub mod numbers;

mod error;

pub use error::{Result, TextProcessingError};

pub use datetime::recognize_datetimes;
pub use fold::{fold, tokens};
pub use intent::{PatternClassifier, PatternModelConfig, PatternModelsFile};
pub use normalizer::normalize_entity;
