//! Resume ranker library

pub mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod llm;
pub mod output;
pub mod processing;
pub mod rubric;

pub use config::Config;
pub use error::{RankerError, Result, ScoringServiceError};
pub use rubric::{Rubric, RubricEntry};
