use serde::{Deserialize, Serialize};

/// A functional category and the endpoint substrings that select it
///
/// # Example TOML
/// ```toml
/// [[category]]
/// name = "Shopping Cart"
/// keywords = ["addCartItem", "cart"]
/// ```
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CategoryDefinition {
    /// Category name reported on matching requests (e.g., "Checkout")
    pub name: String,

    /// Substrings matched case-insensitively against the endpoint
    pub keywords: Vec<String>,
}

impl CategoryDefinition {
    pub fn new(name: impl Into<String>, keywords: &[&str]) -> Self {
        Self {
            name: name.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// True if any keyword occurs inside the (already lowercased) endpoint
    pub(crate) fn matches_lowercase(&self, endpoint_lower: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| endpoint_lower.contains(&k.to_lowercase()))
    }
}
