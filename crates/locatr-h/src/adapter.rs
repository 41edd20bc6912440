use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::error::CdpError;
use locatr_engine::adapter::{AdapterError, DomAdapter};
use serde_json::Value;

/// [`DomAdapter`] over a Chrome DevTools Protocol page.
#[derive(Clone)]
pub struct CdpDomAdapter {
    page: Page,
}

impl CdpDomAdapter {
    pub fn new(page: Page) -> Self {
        Self { page }
    }
}

/// Failures raised by the page's own JS stay `Script`; anything about
/// reaching the page is `Driver`.
fn adapter_error(err: CdpError) -> AdapterError {
    match err {
        CdpError::JavascriptException(_) | CdpError::Chrome(_) | CdpError::ChromeMessage(_) => {
            AdapterError::Script(err.to_string())
        }
        other => AdapterError::Driver(other.to_string()),
    }
}

#[async_trait]
impl DomAdapter for CdpDomAdapter {
    async fn run_script(&self, code: &str) -> Result<(), AdapterError> {
        self.page.evaluate(code).await.map_err(adapter_error)?;
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, AdapterError> {
        let result = self.page.evaluate(expression).await.map_err(adapter_error)?;
        // `undefined` has no JSON value
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }
}
