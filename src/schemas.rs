//! Provider-independent result types.

use serde::{Deserialize, Serialize};

/// Description and keywords generated for one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDescription {
    /// Free-text description of the image.
    pub description: String,
    /// Keywords, most relevant first.
    pub keywords: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_model_output() {
        let text = r#"[{"description":"d1","keywords":["k1"]},{"description":"d2","keywords":["k2","k3"]}]"#;
        let parsed: Vec<ImageDescription> = serde_json::from_str(text).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].description, "d1");
        assert_eq!(parsed[1].keywords, vec!["k2", "k3"]);
    }

    #[test]
    fn rejects_missing_keywords() {
        let text = r#"[{"description":"d1"}]"#;
        assert!(serde_json::from_str::<Vec<ImageDescription>>(text).is_err());
    }

    #[test]
    fn rejects_single_object() {
        let text = r#"{"description":"d1","keywords":[]}"#;
        assert!(serde_json::from_str::<Vec<ImageDescription>>(text).is_err());
    }
}
