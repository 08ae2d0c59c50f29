use serde::Deserialize;

/// Body field that carries related identifiers when none is configured.
pub const DEFAULT_PARAM_KEY: &str = "items";

/// Settings for a [`RelationLinker`](crate::RelationLinker).
///
/// Deserializable so hosts can load it from their own config source:
///
/// ```rust,ignore
/// let config: LinkerConfig = serde_json::from_str(r#"{"param_key": "ids"}"#)?;
/// let linker = RelationLinker::new(finder).with_config(config);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LinkerConfig {
    /// Name of the request body field holding the array of related ids.
    pub param_key: String,
}

impl LinkerConfig {
    #[must_use]
    pub fn with_param_key(mut self, key: impl Into<String>) -> Self {
        self.param_key = key.into();
        self
    }
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            param_key: DEFAULT_PARAM_KEY.to_string(),
        }
    }
}
