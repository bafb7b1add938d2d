pub mod start;
pub mod status;
pub mod translate;
