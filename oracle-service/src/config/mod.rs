//! Oracle configuration: model parameters and env-driven defaults.

pub mod default_config;
pub mod model_config;
