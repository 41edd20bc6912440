pub mod adapter;
pub mod cache;
pub mod config;
pub mod llm;
pub mod providers;
pub mod rerank;
pub mod resolution;
pub mod results;
pub mod validator;

pub use locatr_common::protocol;
pub use resolution::{LocatrEngine, LocatrError, Step};
