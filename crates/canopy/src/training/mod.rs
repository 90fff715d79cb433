//! Tree induction, incremental update and stripping.
//!
//! - [`TreeBuilder`]: builds trees and later updates or strips them
//! - [`TreeConfig`], [`ConfigError`]: configuration with validating builder
//! - [`Scorer`]: split quality rule; [`MseScorer`] (default),
//!   [`GiniImpurityScorer`], [`InformationGainScorer`], or any closure
//! - [`TreeError`]: errors from build, update and strip
//! - [`TrainingLogger`], [`Verbosity`]: progress logging
//! - [`split`]: threshold generation and split search

mod builder;
mod config;
mod error;
mod logger;
mod scorer;
pub mod split;
mod update;

pub use builder::TreeBuilder;
pub use config::{ConfigError, TreeConfig};
pub use error::TreeError;
pub use logger::{TrainingLogger, UpdateStats, Verbosity};
pub use scorer::{GiniImpurityScorer, InformationGainScorer, MseScorer, Scorer};
