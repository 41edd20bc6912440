use crate::adapter::{DomAdapter, is_confirmed, validity_expr};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No candidates to validate")]
    Empty,

    #[error("None of {tried} candidate locator(s) resolved to a unique element")]
    NoValidCandidate { tried: usize },
}

/// Return the first candidate the page confirms, without evaluating the rest.
///
/// An adapter error while checking a candidate counts as a rejection of that
/// candidate; the page helper itself swallows selector syntax errors.
pub async fn first_valid<A: DomAdapter + ?Sized>(
    adapter: &A,
    candidates: &[String],
) -> Result<String, ValidationError> {
    if candidates.is_empty() {
        return Err(ValidationError::Empty);
    }

    for candidate in candidates {
        match adapter.evaluate(&validity_expr(candidate)).await {
            Ok(value) if is_confirmed(&value) => {
                debug!("Valid locator found: `{}`", candidate);
                return Ok(candidate.clone());
            }
            Ok(_) => debug!("Locator `{}` rejected by page", candidate),
            Err(e) => debug!("Locator `{}` could not be checked: {}", candidate, e),
        }
    }

    Err(ValidationError::NoValidCandidate {
        tried: candidates.len(),
    })
}
