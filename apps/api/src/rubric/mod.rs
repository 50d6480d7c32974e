// Scoring configuration: models, built-in defaults, validation, and the
// versioned provider that hands the active configuration to the evaluator.

pub mod defaults;
pub mod handlers;
pub mod models;
pub mod provider;
pub mod validation;
