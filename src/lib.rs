pub mod advice;
pub mod bmi;
pub mod config;
pub mod constants;
pub mod error;
pub mod gemini;
pub mod web_server;

pub use advice::{AdvicePrompt, AdviceRequester, AdviceResponse, TextProvider};
pub use bmi::{evaluate, BmiCategory, BmiResult, HeightUnit, Measurement, WeightUnit};
pub use error::{AdviceError, EvaluationError};
