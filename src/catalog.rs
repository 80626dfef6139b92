//! Course catalog client for language recommendations

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::info;

pub const DEFAULT_COURSES_URL: &str = "https://quant.up.railway.app/courses/";

/// A course as returned by the catalog; only `title` is interpreted
pub type Course = Map<String, Value>;

/// HTTP client for the remote course catalog
#[derive(Clone)]
pub struct CourseCatalog {
    http: reqwest::Client,
    url: String,
}

impl CourseCatalog {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build catalog HTTP client")?;
        let url = url.into();
        info!("Course catalog at {}", url);
        Ok(Self { http, url })
    }

    /// Fetch every course in the catalog
    pub async fn fetch_courses(&self) -> Result<Vec<Course>> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch courses from {}", self.url))?
            .error_for_status()
            .context("Course catalog returned an error status")?;

        response
            .json::<Vec<Course>>()
            .await
            .context("Invalid courses JSON")
    }
}

/// Group courses by language, matching on a case-insensitive title substring.
///
/// Languages without a match map to `None` (serialized as `null`).
pub fn filter_courses(
    languages: &[String],
    courses: &[Course],
) -> BTreeMap<String, Option<Vec<Course>>> {
    let mut filtered = BTreeMap::new();

    for language in languages {
        let needle = language.to_lowercase();
        let matches: Vec<Course> = courses
            .iter()
            .filter(|course| {
                course
                    .get("title")
                    .and_then(Value::as_str)
                    .map(|title| title.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        filtered.insert(
            language.clone(),
            if matches.is_empty() { None } else { Some(matches) },
        );
    }

    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn courses() -> Vec<Course> {
        let value = json!([
            {"id": 1, "title": "Python for Beginners"},
            {"id": 2, "title": "Advanced python"},
            {"id": 3, "title": "JavaScript Essentials"},
            {"id": 4, "name": "untitled"}
        ]);
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_filter_courses_case_insensitive() {
        let filtered = filter_courses(&["PYTHON".to_string()], &courses());
        let python = filtered["PYTHON"].as_ref().unwrap();

        assert_eq!(python.len(), 2);
        assert_eq!(python[0]["id"], 1);
        assert_eq!(python[1]["id"], 2);
    }

    #[test]
    fn test_filter_courses_missing_language_is_null() {
        let filtered = filter_courses(&["Rust".to_string()], &courses());

        assert!(filtered["Rust"].is_none());
        assert_eq!(
            serde_json::to_value(&filtered).unwrap(),
            json!({"Rust": null})
        );
    }

    #[test]
    fn test_filter_courses_skips_untitled() {
        let filtered = filter_courses(&["untitled".to_string()], &courses());
        assert!(filtered["untitled"].is_none());
    }
}
