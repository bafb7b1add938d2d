// Common module
pub mod model_mapping;
