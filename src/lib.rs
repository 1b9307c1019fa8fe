pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::{OpenFoodFactsClient, VisionLabelInterpreter};
pub use core::{engine::NutritionEngine, resolver::ExtractionResolver, tracker::IntakeTracker};
pub use utils::error::{NutriError, Result};
