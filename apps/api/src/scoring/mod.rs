// Scoring Engine: keyword matching per category, inference, aggregation.
// Everything here is pure; persistence lives in `evaluation`.

pub mod aggregator;
pub mod inference;
pub mod matcher;
pub mod models;
