// Candidate, comment and process records, plus the CSV export and read views built on them.

pub mod export;
pub mod handlers;
pub mod pg_store;
pub mod store;
pub mod views;
