pub mod error;
pub mod protocol;

pub use error::{AdapterError, LlmError, RerankError};
pub use protocol::{
    CompletionResponse, ElementSpec, IdToLocatorMap, LocatorOutput, RerankRequest, RerankResult,
};
