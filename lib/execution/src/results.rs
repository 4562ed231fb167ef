use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Media type of the SPARQL 1.1 JSON results format.
pub const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// One page of a [SPARQL JSON result set](https://www.w3.org/TR/sparql11-results-json/).
///
/// Bindings stay opaque [Value]s; the executor only counts and concatenates
/// them. Unknown members survive a round trip through `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolutionPage {
    pub head: SolutionHead,
    pub results: SolutionBindings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolutionHead {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vars: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolutionBindings {
    #[serde(default)]
    pub bindings: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_wire_format() {
        let page: SolutionPage = serde_json::from_str(
            r#"{"head":{"vars":["s"],"link":[]},"results":{"bindings":[
                {"s":{"type":"uri","value":"http://example.com/a"}},
                {"s":{"type":"uri","value":"http://example.com/b"}}
            ]}}"#,
        )
        .unwrap();
        assert_eq!(page.head.vars, ["s"]);
        assert_eq!(page.results.bindings.len(), 2);
        assert!(page.head.extra.contains_key("link"));
    }

    #[test]
    fn serializes_an_empty_page() {
        let page = SolutionPage::default();
        let json = serde_json::to_string(&page).unwrap();
        assert_eq!(json, r#"{"head":{},"results":{"bindings":[]}}"#);
    }
}
