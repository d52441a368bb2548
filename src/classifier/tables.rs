use crate::classifier::CategoryDefinition;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_TOML: &str = include_str!("../../classifier-default.toml");

/// Category reported when no table entry matches
pub const DEFAULT_FALLBACK_CATEGORY: &str = "Other";

/// Errors raised while loading classification tables
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Failed to read classifier tables from {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse classifier tables: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Category name must not be empty")]
    UnnamedCategory,

    #[error("Duplicate category '{0}'")]
    DuplicateCategory(String),

    #[error("Category '{0}' contains an empty keyword")]
    EmptyKeyword(String),

    #[error("Authentication keywords must not be empty strings")]
    EmptyAuthKeyword,
}

/// On-disk layout of a classifier TOML file
#[derive(Debug, Deserialize)]
struct TableFile {
    #[serde(default = "default_fallback")]
    fallback_category: String,
    #[serde(default)]
    auth_keywords: Vec<String>,
    #[serde(default)]
    resource_parents: Vec<String>,
    #[serde(default, rename = "category")]
    categories: Vec<CategoryDefinition>,
}

fn default_fallback() -> String {
    DEFAULT_FALLBACK_CATEGORY.to_string()
}

/// Lookup tables behind endpoint classification
///
/// Swapping tables changes results without touching the matching algorithm.
///
/// # Example
/// ```
/// use loadscope::classifier::ClassifierTables;
///
/// let tables = ClassifierTables::embedded()?;
/// assert_eq!(tables.categorize("addCartItem"), "Shopping Cart");
/// assert!(tables.is_auth("login"));
/// # Ok::<(), loadscope::classifier::ClassifierError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifierTables {
    categories: Vec<CategoryDefinition>,
    auth_keywords: Vec<String>,
    resource_parents: Vec<String>,
    fallback_category: String,

    #[serde(skip)]
    auth_keywords_lower: Vec<String>,
}

impl ClassifierTables {
    /// Build tables, rejecting entries that would make matching ambiguous
    pub fn new(
        categories: Vec<CategoryDefinition>,
        auth_keywords: Vec<String>,
        resource_parents: Vec<String>,
        fallback_category: impl Into<String>,
    ) -> Result<Self, ClassifierError> {
        let mut names = HashSet::new();
        for category in &categories {
            if category.name.trim().is_empty() {
                return Err(ClassifierError::UnnamedCategory);
            }
            if !names.insert(category.name.as_str()) {
                return Err(ClassifierError::DuplicateCategory(category.name.clone()));
            }
            // An empty keyword is a substring of every endpoint
            if category.keywords.iter().any(|k| k.is_empty()) {
                return Err(ClassifierError::EmptyKeyword(category.name.clone()));
            }
        }
        if auth_keywords.iter().any(|k| k.is_empty()) {
            return Err(ClassifierError::EmptyAuthKeyword);
        }

        let auth_keywords_lower = auth_keywords.iter().map(|k| k.to_lowercase()).collect();

        Ok(Self {
            categories,
            auth_keywords,
            resource_parents,
            fallback_category: fallback_category.into(),
            auth_keywords_lower,
        })
    }

    /// Tables compiled into the binary (`classifier-default.toml`)
    pub fn embedded() -> Result<Self, ClassifierError> {
        Self::from_toml_str(DEFAULT_TOML)
    }

    /// Load tables from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ClassifierError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|source| ClassifierError::Read {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse tables from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ClassifierError> {
        let file: TableFile = toml::from_str(content)?;
        Self::new(
            file.categories,
            file.auth_keywords,
            file.resource_parents,
            file.fallback_category,
        )
    }

    /// Category of an endpoint: first table entry with a matching keyword
    pub fn categorize(&self, endpoint: &str) -> &str {
        let endpoint_lower = endpoint.to_lowercase();
        self.categories
            .iter()
            .find(|c| c.matches_lowercase(&endpoint_lower))
            .map(|c| c.name.as_str())
            .unwrap_or(&self.fallback_category)
    }

    /// True iff the endpoint contains any authentication keyword
    pub fn is_auth(&self, endpoint: &str) -> bool {
        let endpoint_lower = endpoint.to_lowercase();
        self.auth_keywords_lower
            .iter()
            .any(|k| endpoint_lower.contains(k.as_str()))
    }

    /// Endpoint name for a request URL, honoring `resource_parents`
    pub fn endpoint_for_url(&self, url: &str) -> Option<String> {
        endpoint_from_url(url, &self.resource_parents)
    }

    pub fn categories(&self) -> &[CategoryDefinition] {
        &self.categories
    }

    pub fn auth_keywords(&self) -> &[String] {
        &self.auth_keywords
    }

    pub fn fallback_category(&self) -> &str {
        &self.fallback_category
    }
}

/// Derive the endpoint from a request URL
///
/// Takes the last non-empty path segment. When the segment before it is one of
/// `resource_parents` (e.g. `.../product/<id>`), the parent segment is the
/// endpoint and the trailing segment is treated as a resource id. Scheme,
/// authority, query and fragment are ignored. Returns `None` when the URL has
/// no path segments.
pub fn endpoint_from_url(url: &str, resource_parents: &[String]) -> Option<String> {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let without_query = without_fragment
        .split('?')
        .next()
        .unwrap_or(without_fragment);
    let path = match without_query.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map(|(_, path)| path).unwrap_or(""),
        None => without_query,
    };

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let last = *segments.last()?;

    if let Some(parent) = segments.len().checked_sub(2).map(|i| segments[i]) {
        if resource_parents
            .iter()
            .any(|p| p.eq_ignore_ascii_case(parent))
        {
            return Some(parent.to_string());
        }
    }

    Some(last.to_string())
}
