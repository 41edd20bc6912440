//! DOM adapter seam.
//!
//! The engine only ever talks to a page through [`DomAdapter`]: inject the
//! helper script, then evaluate one of a handful of fixed expressions.
//! One implementation exists per automation backend (CDP, WebDriver, ...);
//! tests use mock implementations.

use async_trait::async_trait;
use locatr_common::protocol::{ElementSpec, IdToLocatorMap};
pub use locatr_common::error::AdapterError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Page helper defining `minifyHTML()`, `mapElementsToJson()` and `isValidLocator()`.
pub const HELPER_SCRIPT: &str = include_str!("js/helpers.js");

pub const CURRENT_URL_EXPR: &str = "window.location.href";
pub const MINIFY_DOM_EXPR: &str = "minifyHTML()";
pub const LOCATOR_MAP_EXPR: &str = "mapElementsToJson()";

/// The capability interface every automation backend must provide.
#[async_trait]
pub trait DomAdapter: Send + Sync {
    /// Run a script in the page for its side effects (defining helpers).
    async fn run_script(&self, code: &str) -> Result<(), AdapterError>;

    /// Evaluate an expression in the page and return its value.
    ///
    /// Helpers that `JSON.stringify` their result come back as `Value::String`;
    /// backends that return structured values are accepted as well.
    async fn evaluate(&self, expression: &str) -> Result<Value, AdapterError>;
}

/// One atomic capture of the page: the minified tree and its id map.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub root: ElementSpec,
    pub locators: IdToLocatorMap,
}

/// Expression asking the helper whether `selector` resolves to exactly one usable element.
pub fn validity_expr(selector: &str) -> String {
    // serde_json string encoding doubles as a safe JS string literal
    let literal = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
    format!("isValidLocator({})", literal)
}

/// Decode a helper payload that may arrive either as a JSON string or as a structured value.
pub fn decode_payload<T: DeserializeOwned>(value: Value) -> Result<T, AdapterError> {
    match value {
        Value::String(raw) => {
            serde_json::from_str(&raw).map_err(|e| AdapterError::Payload(e.to_string()))
        }
        other => serde_json::from_value(other).map_err(|e| AdapterError::Payload(e.to_string())),
    }
}

pub async fn current_url<A: DomAdapter + ?Sized>(adapter: &A) -> Result<String, AdapterError> {
    match adapter.evaluate(CURRENT_URL_EXPR).await? {
        Value::String(url) => Ok(url),
        other => Err(AdapterError::Payload(format!(
            "expected URL string, got {}",
            other
        ))),
    }
}

pub async fn snapshot<A: DomAdapter + ?Sized>(adapter: &A) -> Result<Snapshot, AdapterError> {
    let root: ElementSpec = decode_payload(adapter.evaluate(MINIFY_DOM_EXPR).await?)?;
    let locators: IdToLocatorMap = decode_payload(adapter.evaluate(LOCATOR_MAP_EXPR).await?)?;
    Ok(Snapshot { root, locators })
}

/// Interpret the helper's validity answer. Only `true` (or the string "true") confirms.
pub fn is_confirmed(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim() == "true",
        _ => false,
    }
}
