// Evaluation lifecycle: the single-result store, the per-candidate service,
// and the batch orchestrator that drives it over many candidates.

pub mod batch;
pub mod handlers;
pub mod locks;
pub mod pg_store;
pub mod service;
pub mod store;
