use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed set of inventory groupings understood by the upstream backend.
///
/// The serialized form is the exact variant name; matching is case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum ProductCategory {
    Accessories,
    Hardware,
    Software,
    Books,
    Movies,
    Music,
    Games,
    #[default]
    Other,
}

/// Lookup table used both for parsing and for fan-out over every category.
static CATEGORY_TABLE: [(&str, ProductCategory); 8] = [
    ("Accessories", ProductCategory::Accessories),
    ("Hardware", ProductCategory::Hardware),
    ("Software", ProductCategory::Software),
    ("Books", ProductCategory::Books),
    ("Movies", ProductCategory::Movies),
    ("Music", ProductCategory::Music),
    ("Games", ProductCategory::Games),
    ("Other", ProductCategory::Other),
];

impl ProductCategory {
    /// Every category, in declaration order.
    pub fn all() -> impl Iterator<Item = ProductCategory> {
        CATEGORY_TABLE.iter().map(|(_, c)| *c)
    }

    pub fn names() -> Vec<&'static str> {
        CATEGORY_TABLE.iter().map(|(name, _)| *name).collect()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::Accessories => "Accessories",
            ProductCategory::Hardware => "Hardware",
            ProductCategory::Software => "Software",
            ProductCategory::Books => "Books",
            ProductCategory::Movies => "Movies",
            ProductCategory::Music => "Music",
            ProductCategory::Games => "Games",
            ProductCategory::Other => "Other",
        }
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a caller-supplied category is not one of [`ProductCategory`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for ProductCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CATEGORY_TABLE
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, c)| *c)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}
