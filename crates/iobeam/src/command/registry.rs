//! Per-resource names and API paths, collected while the tree is built.

use std::collections::BTreeMap;

/// Name of the root command.
pub const ROOT: &str = "iobeam";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Prefix shown in usage text, e.g. `iobeam device`.
    pub flag_set: String,
    /// Base API path, e.g. `/v1/devices`. Empty for local-only groups.
    pub api_path: String,
}

/// Keyword to [`Entry`] lookup.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: BTreeMap<String, Entry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a top-level keyword and its API path; returns the path.
    pub fn register(&mut self, keyword: &str, api_path: &str) -> String {
        self.entries.insert(
            keyword.to_string(),
            Entry {
                flag_set: format!("{ROOT} {keyword}"),
                api_path: api_path.to_string(),
            },
        );
        api_path.to_string()
    }

    pub fn get(&self, keyword: &str) -> Option<&Entry> {
        self.entries.get(keyword)
    }

    /// Base API path for `keyword`, empty when unknown.
    pub fn api_path(&self, keyword: &str) -> &str {
        self.get(keyword).map(|e| e.api_path.as_str()).unwrap_or_default()
    }

    /// Usage prefix for `keyword`, or just the root name when unknown.
    pub fn flag_set(&self, keyword: &str) -> &str {
        self.get(keyword).map(|e| e.flag_set.as_str()).unwrap_or(ROOT)
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut registry = Registry::new();
        assert_eq!(registry.register("file", "/v1/files"), "/v1/files");

        assert_eq!(registry.api_path("file"), "/v1/files");
        assert_eq!(registry.flag_set("file"), "iobeam file");
        assert_eq!(registry.api_path("nope"), "");
        assert_eq!(registry.flag_set("nope"), "iobeam");
    }
}
