use crate::adapter::AdapterError;
use crate::llm::LlmError;
use crate::rerank::RerankError;
use crate::validator::ValidationError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Resolution steps, in the order the engine runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ScriptLoad,
    CacheLookup,
    Serialize,
    Rerank,
    Identify,
    MapLookup,
    Validate,
    CacheWrite,
    /// The whole call, when a caller-supplied deadline elapses.
    Resolution,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::ScriptLoad => "script_load",
            Step::CacheLookup => "cache_lookup",
            Step::Serialize => "serialize",
            Step::Rerank => "rerank",
            Step::Identify => "identify",
            Step::MapLookup => "map_lookup",
            Step::Validate => "validate",
            Step::CacheWrite => "cache_write",
            Step::Resolution => "resolution",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum LocatrError {
    #[error("Unable to load page helper scripts: {0}")]
    ScriptLoadFailure(#[source] AdapterError),

    #[error("Unable to capture DOM during {step}: {source}")]
    DomSerializationFailure {
        step: Step,
        #[source]
        source: AdapterError,
    },

    #[error("Relevance filtering failed: {0}")]
    RerankFailure(#[source] RerankError),

    #[error("Identification request failed: {0}")]
    IdentificationFailure(#[from] LlmError),

    /// The model answered, but reported the element as not present.
    #[error("Model could not identify the element: {0}")]
    ElementNotIdentified(String),

    #[error("Malformed model output ({reason}): {raw}")]
    MalformedModelOutput { raw: String, reason: String },

    #[error("Model returned unknown element id `{0}`")]
    UnknownElementId(String),

    #[error("Unable to find a valid locator: {0}")]
    NoValidCandidate(#[source] ValidationError),

    #[error("{step} timed out after {after:?}")]
    StepTimeout { step: Step, after: Duration },
}

impl LocatrError {
    /// The step at which resolution failed.
    pub fn step(&self) -> Step {
        match self {
            LocatrError::ScriptLoadFailure(_) => Step::ScriptLoad,
            LocatrError::DomSerializationFailure { step, .. } => *step,
            LocatrError::RerankFailure(_) => Step::Rerank,
            LocatrError::IdentificationFailure(_)
            | LocatrError::ElementNotIdentified(_)
            | LocatrError::MalformedModelOutput { .. } => Step::Identify,
            LocatrError::UnknownElementId(_) => Step::MapLookup,
            LocatrError::NoValidCandidate(_) => Step::Validate,
            LocatrError::StepTimeout { step, .. } => *step,
        }
    }
}
