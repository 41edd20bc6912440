pub mod engine;
pub mod error;

pub use engine::LocatrEngine;
pub use error::{LocatrError, Step};
