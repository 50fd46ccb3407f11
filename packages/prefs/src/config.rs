//! Suite configuration.

/// Configuration for a `Suite`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteConfig {
    /// Name of the suite, used in logs.
    pub name: String,
    /// Whether declaring a key registers its default value in the store.
    pub register_defaults: bool,
}

impl SuiteConfig {
    /// Default configuration under another name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            name: "standard".to_string(),
            register_defaults: true,
        }
    }
}
