//! Identification client seam and the prompt/response contract around it.

use async_trait::async_trait;
pub use locatr_common::error::LlmError;
use locatr_common::protocol::{CompletionResponse, LocatorOutput};
use serde::Serialize;

/// Instruction preamble sent ahead of every `{html_dom, user_req}` payload.
pub const LOCATE_ELEMENT_PROMPT: &str = r#"Your task is to identify the HTML element that matches a user's requirement from a given HTML DOM structure and return its unique id in a JSON format. The element may not match the user's requirement exactly. If the element is not found, provide an appropriate error message in the JSON output.

Every element carries an `id` attribute holding its unique id. Only ids present in the supplied DOM are valid answers.

Respond with a single JSON object and nothing else: no prose, no markdown.

Output Format:
{
  "locator_id": "str",
  "error": "str"
}

Input Format:
{
  "html_dom": "<!-- Your HTML DOM here -->",
  "user_req": "The user's requirement here"
}
"#;

/// Chat completion client used to identify the element a description refers to.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn chat_completion(&self, prompt: &str) -> Result<CompletionResponse, LlmError>;
}

#[derive(Serialize)]
struct WebInput<'a> {
    html_dom: &'a str,
    user_req: &'a str,
}

/// Preamble followed by the JSON-encoded DOM and request.
pub fn build_prompt(html_dom: &str, user_req: &str) -> String {
    let payload = serde_json::to_string(&WebInput { html_dom, user_req })
        .unwrap_or_else(|_| String::from("{}"));
    format!("{}{}", LOCATE_ELEMENT_PROMPT, payload)
}

/// Strip the wrapping models tend to add around JSON: code fences and a leading `json` tag.
pub fn normalize_completion(raw: &str) -> &str {
    let mut text = raw.trim();
    text = text.strip_prefix("```").unwrap_or(text);
    text = text.strip_prefix("json").unwrap_or(text);
    text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}

/// Normalize and parse a completion into the locator output object.
pub fn parse_locator_output(raw: &str) -> Result<LocatorOutput, serde_json::Error> {
    serde_json::from_str(normalize_completion(raw))
}
