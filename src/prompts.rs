//! System prompt tables
//!
//! Both tables are loaded once at startup and never mutated; the batcher and
//! the handlers receive them by value or behind an `Arc`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::debug;

/// Built-in system prompts, one per request kind
const BUILTIN_PROMPTS: &[(&str, &str)] = &[
    ("ask", include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/prompts/ask.txt"))),
    ("lesson", include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/prompts/lesson.txt"))),
    ("feedback", include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/prompts/feedback.txt"))),
    ("test", include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/prompts/test.txt"))),
    (
        "yourlanguage",
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/prompts/yourlanguage.txt")),
    ),
];

/// Immutable mapping from request kind to system prompt
#[derive(Debug, Clone, Default)]
pub struct PromptTable {
    prompts: HashMap<String, String>,
}

impl PromptTable {
    /// Prompts bundled with the binary
    pub fn builtin() -> Self {
        Self::from_pairs(BUILTIN_PROMPTS.iter().map(|(k, v)| (k.to_string(), v.to_string())))
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let prompts = pairs
            .into_iter()
            .map(|(kind, prompt)| (kind, prompt.trim_end().to_string()))
            .collect();
        Self { prompts }
    }

    /// Load every `<kind>.txt` file in `dir`
    pub fn load_dir(dir: &Path) -> anyhow::Result<Self> {
        let mut pairs = Vec::new();
        let entries =
            fs::read_dir(dir).with_context(|| format!("Failed to read prompts dir {:?}", dir))?;

        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }
            let Some(kind) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let prompt = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read prompt {:?}", path))?;
            debug!("Loaded prompt for kind {} from {:?}", kind, path);
            pairs.push((kind.to_string(), prompt));
        }

        if pairs.is_empty() {
            anyhow::bail!("No prompt files (*.txt) found in {:?}", dir);
        }

        Ok(Self::from_pairs(pairs))
    }

    pub fn get(&self, kind: &str) -> Option<&str> {
        self.prompts.get(kind).map(String::as_str)
    }

    /// Sorted list of configured kinds
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.prompts.keys().cloned().collect();
        kinds.sort();
        kinds
    }
}

#[derive(Debug, Deserialize)]
struct RawFeatures {
    #[serde(default)]
    features: HashMap<String, String>,
}

/// Feature prompts used by the compiler assistant (`[features]` table)
#[derive(Debug, Clone, Default)]
pub struct FeaturePrompts {
    features: HashMap<String, String>,
}

impl FeaturePrompts {
    pub fn builtin() -> anyhow::Result<Self> {
        let content = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/features.toml"));
        Self::from_toml_str(content).context("Invalid bundled features.toml")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read feature prompts {:?}", path))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse feature prompts {:?}", path))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let raw: RawFeatures = toml::from_str(content)?;
        Ok(Self {
            features: raw.features,
        })
    }

    pub fn get(&self, feature: &str) -> Option<&str> {
        self.features.get(feature).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
