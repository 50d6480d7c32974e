pub mod candidate;
pub mod comment;
pub mod process;
pub mod user;
