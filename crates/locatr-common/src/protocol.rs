use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;

/// Custom deserializer for HashMap<String, String> that filters out null values.
/// Page helpers emit `null` for attributes that exist but carry no value.
fn deserialize_nullable_string_map<'de, D>(
    deserializer: D,
) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let map: Option<HashMap<String, Option<String>>> = Option::deserialize(deserializer)?;
    Ok(map
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| v.map(|val| (k, val)))
        .collect())
}

fn deserialize_nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// One node of a minified DOM snapshot.
///
/// `id` is only unique within the snapshot that produced it and must be looked
/// up in the [`IdToLocatorMap`] captured alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSpec {
    pub id: String,
    pub tag_name: String,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub text: String,
    #[serde(default, deserialize_with = "deserialize_nullable_string_map")]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub children: Vec<ElementSpec>,
}

impl ElementSpec {
    /// Render the snapshot as compact HTML.
    ///
    /// Attributes are written in sorted order so identical snapshots always
    /// render to identical text; the snapshot id is appended last as `id="…"`.
    pub fn content_str(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        let tag = self.tag_name.to_lowercase();
        let mut keys: Vec<&String> = self.attributes.keys().collect();
        keys.sort();

        out.push('<');
        out.push_str(&tag);
        for key in keys {
            let _ = write!(out, " {}=\"{}\"", key, self.attributes[key]);
        }
        let _ = write!(out, " id=\"{}\">", self.id);
        out.push_str(&self.text);
        for child in &self.children {
            child.write_html(out);
        }
        let _ = write!(out, "</{}>", tag);
    }

    /// Depth-first count of nodes in the snapshot.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Self::node_count).sum::<usize>()
    }
}

/// Snapshot id -> candidate selectors, most specific first.
pub type IdToLocatorMap = HashMap<String, Vec<String>>;

/// Response of one chat completion made by an identification client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub completion: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    /// Wall-clock time of the request in milliseconds.
    pub elapsed_ms: u64,
}

/// The JSON object the model is instructed to answer with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorOutput {
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub locator_id: String,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub error: String,
}

impl LocatorOutput {
    /// The model answered with an id and no error.
    pub fn is_found(&self) -> bool {
        !self.locator_id.is_empty() && self.error.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankRequest {
    pub query: String,
    pub documents: Vec<String>,
}

/// One scored document, `index` pointing into [`RerankRequest::documents`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RerankResult {
    pub index: usize,
    pub score: f64,
}
