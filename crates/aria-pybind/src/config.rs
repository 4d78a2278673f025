//! Configuration for structural extraction and marshalling.

use serde::{Deserialize, Serialize};

/// How the attribute lookup treats a bridged method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MethodKind {
    /// Exposed as a bound callable
    Plain,
    /// Invoked on attribute read, like a computed property
    Property,
}

impl Default for MethodKind {
    fn default() -> Self {
        MethodKind::Plain
    }
}

/// A method name prefix that is stripped during extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodPrefix {
    pub prefix: String,
    pub kind: MethodKind,
}

impl MethodPrefix {
    pub fn new(prefix: impl Into<String>, kind: MethodKind) -> Self {
        Self {
            prefix: prefix.into(),
            kind,
        }
    }
}

/// Configuration for the native bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Prefixes checked in order; the first match is stripped
    pub method_prefixes: Vec<MethodPrefix>,

    /// Maximum nesting depth the marshaller descends
    pub max_depth: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            method_prefixes: vec![
                MethodPrefix::new("method_", MethodKind::Plain),
                MethodPrefix::new("property_", MethodKind::Property),
            ],
            max_depth: 256,
        }
    }
}

impl BridgeConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration that strips no prefixes: every method is plain and
    /// exposed under its own identifier
    pub fn unprefixed() -> Self {
        Self {
            method_prefixes: Vec::new(),
            ..Default::default()
        }
    }

    /// Replace the marshalling depth limit
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Exposed name and classification for a method identifier
    pub fn classify_method<'a>(&self, ident: &'a str) -> (&'a str, MethodKind) {
        for entry in &self.method_prefixes {
            if let Some(stripped) = ident.strip_prefix(entry.prefix.as_str()) {
                if !stripped.is_empty() {
                    return (stripped, entry.kind);
                }
            }
        }
        (ident, MethodKind::Plain)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_depth == 0 {
            return Err("max_depth must be greater than 0".to_string());
        }

        for (i, entry) in self.method_prefixes.iter().enumerate() {
            if entry.prefix.is_empty() {
                return Err("method prefixes must not be empty".to_string());
            }
            if self.method_prefixes[..i].iter().any(|p| p.prefix == entry.prefix) {
                return Err(format!("duplicate method prefix '{}'", entry.prefix));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.max_depth, 256);
        assert_eq!(config.method_prefixes.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_classify_method() {
        let config = BridgeConfig::default();
        assert_eq!(config.classify_method("method_plus"), ("plus", MethodKind::Plain));
        assert_eq!(config.classify_method("property_value"), ("value", MethodKind::Property));
        assert_eq!(config.classify_method("method1"), ("method1", MethodKind::Plain));
        // a bare prefix keeps its name
        assert_eq!(config.classify_method("property_"), ("property_", MethodKind::Plain));
    }

    #[test]
    fn test_unprefixed_keeps_names() {
        let config = BridgeConfig::unprefixed();
        assert_eq!(config.classify_method("property_value"), ("property_value", MethodKind::Plain));
    }

    #[test]
    fn test_validate_rejects_bad_config() {
        assert!(BridgeConfig::new().with_max_depth(0).validate().is_err());

        let mut config = BridgeConfig::default();
        config.method_prefixes.push(MethodPrefix::new("method_", MethodKind::Property));
        assert!(config.validate().unwrap_err().contains("duplicate"));

        let mut config = BridgeConfig::default();
        config.method_prefixes.push(MethodPrefix::new("", MethodKind::Plain));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: BridgeConfig = serde_json::from_str(r#"{"max_depth": 8}"#).unwrap();
        assert_eq!(config.max_depth, 8);
        assert_eq!(config.method_prefixes, BridgeConfig::default().method_prefixes);

        let json = serde_json::to_string(&config).unwrap();
        let back: BridgeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
