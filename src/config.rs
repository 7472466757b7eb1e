//! Configuration file loading and the Gemini provider config.
//!
//! Values come from two places: the TOML config file and `GEMINI_*`
//! environment variables. A value set in the file wins; the environment only
//! fills what the file leaves unset.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Error;
use crate::exiftool::ExifTool;
use crate::model::ModelName;

/// Environment variable prefix for the Gemini settings.
pub const ENV_PREFIX: &str = "GEMINI_";

/// Prompt sent with every batch of images.
pub const DEFAULT_IMAGE_DESCRIPTION_PROMPT: &str = "Write a detailed description and key words of \
     each image, with this JSON schema: Image = {\"description\": str, \"keywords\": list[str]}. \
     Return: list[Image], one entry per image, in the order the images were given.";

/// Maximum number of images Gemini accepts in one request.
pub const DEFAULT_MAX_IMAGE_COUNT: usize = 3600;

/// Top-level configuration file.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Gemini provider settings.
    #[serde(default)]
    pub gemini: GeminiSettings,

    /// Metadata tool settings.
    #[serde(default)]
    pub exiftool: ExifToolSettings,
}

/// Gemini settings as written in the config file. Every field is optional.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct GeminiSettings {
    /// API key.
    pub api_key: Option<String>,
    /// Model name, alias or full resource name.
    pub model_name: Option<String>,
    /// Prompt override.
    pub image_description_prompt: Option<String>,
    /// Maximum images per request.
    pub max_image_count: Option<usize>,
    /// Always upload images instead of inlining them.
    pub force_upload: Option<bool>,
}

/// Metadata tool settings.
#[derive(Debug, Default, Deserialize)]
pub struct ExifToolSettings {
    /// Path to the exiftool executable. Looked up on `PATH` when unset.
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the given path, or return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
        toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
    }

    /// The metadata tool handle described by this config.
    #[must_use]
    pub fn exiftool(&self) -> ExifTool {
        self.exiftool.path.as_ref().map_or_else(ExifTool::default, ExifTool::new)
    }
}

/// Resolved Gemini provider configuration. Immutable once built.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key. Empty when none was configured; the live transport refuses
    /// to start without one.
    pub api_key: String,
    /// Model to call.
    pub model_name: Option<ModelName>,
    /// Prompt sent before the images.
    pub image_description_prompt: String,
    /// Maximum images per request.
    pub max_image_count: usize,
    /// Always upload images instead of inlining them.
    pub force_upload: bool,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model_name: None,
            image_description_prompt: DEFAULT_IMAGE_DESCRIPTION_PROMPT.to_string(),
            max_image_count: DEFAULT_MAX_IMAGE_COUNT,
            force_upload: false,
        }
    }
}

impl GeminiConfig {
    /// Config with the given key and defaults everywhere else.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), ..Self::default() }
    }

    /// Set the model.
    #[must_use]
    pub fn with_model(mut self, model: ModelName) -> Self {
        self.model_name = Some(model);
        self
    }

    /// Merge explicit settings with environment variables.
    ///
    /// Explicit values win. Unset fields are read through `env` using the
    /// `GEMINI_` prefix (`GEMINI_API_KEY`, `GEMINI_MODEL_NAME`, ...), then
    /// fall back to defaults. `GEMINI_MODEL_NAME` may be a plain name or a
    /// JSON object `{"name": ..., "displayName": ...}`.
    ///
    /// # Errors
    ///
    /// Returns an error if a model name is invalid or a numeric/boolean
    /// environment value cannot be parsed.
    pub fn resolve<F>(explicit: &GeminiSettings, env: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |field: &str| env(&format!("{ENV_PREFIX}{}", field.to_uppercase()));
        let defaults = Self::default();

        let api_key = explicit.api_key.clone().or_else(|| lookup("api_key")).unwrap_or_default();

        let model_name = match &explicit.model_name {
            Some(name) => Some(ModelName::resolve(name)?),
            None => lookup("model_name").map(|raw| parse_model_env(&raw)).transpose()?,
        };

        let image_description_prompt = explicit
            .image_description_prompt
            .clone()
            .or_else(|| lookup("image_description_prompt"))
            .unwrap_or(defaults.image_description_prompt);

        let max_image_count = match explicit.max_image_count {
            Some(count) => count,
            None => lookup("max_image_count")
                .map(|raw| {
                    raw.trim().parse::<usize>().map_err(|e| {
                        Error::Config(format!("Invalid {ENV_PREFIX}MAX_IMAGE_COUNT '{raw}': {e}"))
                    })
                })
                .transpose()?
                .unwrap_or(defaults.max_image_count),
        };

        let force_upload = match explicit.force_upload {
            Some(flag) => flag,
            None => lookup("force_upload").map(|raw| parse_bool(&raw)).transpose()?.unwrap_or(false),
        };

        Ok(Self { api_key, model_name, image_description_prompt, max_image_count, force_upload })
    }
}

fn parse_model_env(raw: &str) -> Result<ModelName, Error> {
    if raw.trim_start().starts_with('{') {
        let model: ModelName = serde_json::from_str(raw)
            .map_err(|e| Error::Config(format!("Invalid {ENV_PREFIX}MODEL_NAME: {e}")))?;
        let display_name = model.display_name;
        Ok(ModelName { display_name, ..ModelName::resolve(&model.name)? })
    } else {
        ModelName::resolve(raw)
    }
}

fn parse_bool(raw: &str) -> Result<bool, Error> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(Error::Config(format!("Invalid {ENV_PREFIX}FORCE_UPLOAD '{other}'"))),
    }
}

/// Discover the config file path using the resolution order:
/// 1. Explicit path (from `--config` flag)
/// 2. `IMGDESCGEN_CONFIG` environment variable
/// 3. `~/.config/imgdescgen/config.toml`
#[must_use]
pub fn discover_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    if let Ok(p) = std::env::var("IMGDESCGEN_CONFIG") {
        return PathBuf::from(p);
    }

    default_config_path()
}

fn default_config_path() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".config/imgdescgen/config.toml")
    } else {
        PathBuf::from("imgdescgen.toml")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|&(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_file_or_env() {
        let config = GeminiConfig::resolve(&GeminiSettings::default(), env_from(&[])).unwrap();
        assert!(config.api_key.is_empty());
        assert!(config.model_name.is_none());
        assert_eq!(config.max_image_count, DEFAULT_MAX_IMAGE_COUNT);
        assert!(!config.force_upload);
        assert_eq!(config.image_description_prompt, DEFAULT_IMAGE_DESCRIPTION_PROMPT);
    }

    #[test]
    fn env_fills_unset_fields() {
        let env = env_from(&[
            ("GEMINI_API_KEY", "env-key"),
            ("GEMINI_MODEL_NAME", "flash"),
            ("GEMINI_MAX_IMAGE_COUNT", "5"),
            ("GEMINI_FORCE_UPLOAD", "true"),
            ("GEMINI_IMAGE_DESCRIPTION_PROMPT", "describe"),
        ]);
        let config = GeminiConfig::resolve(&GeminiSettings::default(), env).unwrap();
        assert_eq!(config.api_key, "env-key");
        assert_eq!(config.model_name.unwrap().name, "models/gemini-1.5-flash");
        assert_eq!(config.max_image_count, 5);
        assert!(config.force_upload);
        assert_eq!(config.image_description_prompt, "describe");
    }

    #[test]
    fn explicit_wins_over_env() {
        let explicit = GeminiSettings {
            api_key: Some("file-key".into()),
            model_name: Some("pro".into()),
            max_image_count: Some(2),
            force_upload: Some(false),
            ..GeminiSettings::default()
        };
        let env = env_from(&[
            ("GEMINI_API_KEY", "env-key"),
            ("GEMINI_MODEL_NAME", "flash"),
            ("GEMINI_MAX_IMAGE_COUNT", "9"),
            ("GEMINI_FORCE_UPLOAD", "1"),
        ]);
        let config = GeminiConfig::resolve(&explicit, env).unwrap();
        assert_eq!(config.api_key, "file-key");
        assert_eq!(config.model_name.unwrap().name, "models/gemini-1.5-pro");
        assert_eq!(config.max_image_count, 2);
        assert!(!config.force_upload);
    }

    #[test]
    fn structured_model_name_from_env() {
        let env = env_from(&[(
            "GEMINI_MODEL_NAME",
            r#"{"name":"models/gemini-1.5-flash","displayName":"Gemini 1.5 Flash"}"#,
        )]);
        let model = GeminiConfig::resolve(&GeminiSettings::default(), env)
            .unwrap()
            .model_name
            .unwrap();
        assert_eq!(model.name, "models/gemini-1.5-flash");
        assert_eq!(model.display_name.as_deref(), Some("Gemini 1.5 Flash"));
    }

    #[test]
    fn invalid_env_values_fail() {
        let env = env_from(&[("GEMINI_MAX_IMAGE_COUNT", "many")]);
        assert!(GeminiConfig::resolve(&GeminiSettings::default(), env).is_err());

        let env = env_from(&[("GEMINI_FORCE_UPLOAD", "maybe")]);
        assert!(GeminiConfig::resolve(&GeminiSettings::default(), env).is_err());
    }

    #[test]
    fn load_nonexistent_returns_defaults() {
        let config = Config::load(Path::new("/nonexistent/path/config.toml")).unwrap();
        assert!(config.gemini.api_key.is_none());
        assert!(config.exiftool.path.is_none());
    }

    #[test]
    fn load_valid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[gemini]
api_key = "test-gemini-key"
model_name = "models/gemini-1.5-flash"
max_image_count = 10
force_upload = true

[exiftool]
path = "/opt/exiftool/exiftool"
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.gemini.api_key.as_deref(), Some("test-gemini-key"));
        assert_eq!(config.gemini.model_name.as_deref(), Some("models/gemini-1.5-flash"));
        assert_eq!(config.gemini.max_image_count, Some(10));
        assert_eq!(config.gemini.force_upload, Some(true));
        assert_eq!(config.exiftool.path, Some(PathBuf::from("/opt/exiftool/exiftool")));
        assert_eq!(config.exiftool().program(), Path::new("/opt/exiftool/exiftool"));
    }

    #[test]
    fn load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn discover_explicit_path() {
        let path = discover_config_path(Some(Path::new("/tmp/my-config.toml")));
        assert_eq!(path, PathBuf::from("/tmp/my-config.toml"));
    }
}
