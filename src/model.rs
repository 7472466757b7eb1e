//! Gemini model name resolution.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Prefix every Gemini model resource name carries.
pub const MODEL_PREFIX: &str = "models/";

/// Short name aliases for popular models.
const ALIASES: &[(&str, &str)] = &[
    ("flash", "gemini-1.5-flash"),
    ("flash-8b", "gemini-1.5-flash-8b"),
    ("pro", "gemini-1.5-pro"),
    ("flash-2", "gemini-2.0-flash"),
];

/// Identifier of a Gemini model, `models/{base-id}-{version}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelName {
    /// Resource name, e.g. `"models/gemini-1.5-flash"`.
    pub name: String,
    /// Human readable name, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ModelName {
    /// Resolve an alias, a bare model id, or a full resource name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or contains whitespace.
    pub fn resolve(input: &str) -> Result<Self, Error> {
        let input = input.trim();
        let base = input.strip_prefix(MODEL_PREFIX).unwrap_or(input);
        if base.is_empty() || base.chars().any(char::is_whitespace) {
            return Err(Error::Config(format!("Invalid model name '{input}'")));
        }

        let base = ALIASES
            .iter()
            .find(|&&(alias, _)| alias == base)
            .map_or(base, |&(_, full)| full);

        Ok(Self { name: format!("{MODEL_PREFIX}{base}"), display_name: None })
    }
}

impl std::fmt::Display for ModelName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
