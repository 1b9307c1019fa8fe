// Adapters layer: concrete implementations of the domain ports for external services.

pub mod open_food_facts;
pub mod photo;
pub mod vision_interpreter;

pub use open_food_facts::OpenFoodFactsClient;
pub use vision_interpreter::VisionLabelInterpreter;
