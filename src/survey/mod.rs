/// Survey input - Gateway
mod input;

pub use input::{SurveyInput, SurveyValue};
