pub mod engine;
pub mod resolver;
pub mod tracker;

pub use crate::domain::model::{
    ExtractionOutcome, ExtractionRequest, ExtractionSource, NutritionRecord,
};
pub use crate::domain::ports::{ConfigProvider, LabelInterpreter, ProductDatabase};
pub use crate::utils::error::Result;
