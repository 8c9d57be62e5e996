pub mod outcome;
pub mod runner;

pub use outcome::{ConversionResult, ConversionWarning};
pub use runner::ConversionPipeline;
