// Core data structures for the povar crawler

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Raw listing entry as extracted by a page fetcher, before normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem {
    pub name: String,
    pub href: String,
}

impl RawItem {
    pub fn new(name: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            href: href.into(),
        }
    }
}

/// Recipe category discovered on the source listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub href: String,
}

impl Category {
    /// Build a category from a raw listing entry, normalizing and validating
    /// it in one step
    pub fn from_raw(raw: &RawItem) -> Result<Self, ValidationError> {
        let category = Self {
            name: normalize_name(&raw.name),
            href: normalize_href(&raw.href),
        };
        category.validate()?;
        Ok(category)
    }

    /// Check that the category data is acceptable for scheduling
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.href.is_empty() {
            return Err(ValidationError::EmptyHref);
        }
        Ok(())
    }
}

/// Recipe discovered on a category page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub href: String,
}

impl Recipe {
    /// Build a recipe from a raw listing entry, normalizing and validating
    /// it in one step
    pub fn from_raw(raw: &RawItem) -> Result<Self, ValidationError> {
        let recipe = Self {
            name: normalize_name(&raw.name),
            href: normalize_href(&raw.href),
        };
        recipe.validate()?;
        Ok(recipe)
    }

    /// Check that the recipe data is acceptable for scheduling
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.href.is_empty() {
            return Err(ValidationError::EmptyHref);
        }
        Ok(())
    }
}

/// Normalize an item name: trim surrounding whitespace and case-fold
///
/// The normalized name doubles as the deduplication key, so two spellings of
/// the same item collapse to one entry.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Normalize an href: trim surrounding whitespace
pub fn normalize_href(raw: &str) -> String {
    raw.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name_folds_case_and_whitespace() {
        assert_eq!(normalize_name("  Завтраки  "), "завтраки");
        assert_eq!(normalize_name("BREAKFAST"), "breakfast");
        assert_eq!(normalize_name("   "), "");
    }

    #[test]
    fn test_category_from_raw() {
        let raw = RawItem::new("  Супы ", " /recepty/supy ");
        let category = Category::from_raw(&raw).unwrap();
        assert_eq!(category.name, "супы");
        assert_eq!(category.href, "/recepty/supy");
    }

    #[test]
    fn test_category_empty_name_rejected() {
        let raw = RawItem::new("   ", "/recepty/supy");
        assert_eq!(Category::from_raw(&raw), Err(ValidationError::EmptyName));
    }

    #[test]
    fn test_recipe_empty_href_rejected() {
        let raw = RawItem::new("Драники", "  ");
        assert_eq!(Recipe::from_raw(&raw), Err(ValidationError::EmptyHref));
    }

    #[test]
    fn test_recipe_from_raw() {
        let raw = RawItem::new("Драники из батата", "/recepty/zavtraki/draniki-187448");
        let recipe = Recipe::from_raw(&raw).unwrap();
        assert_eq!(recipe.name, "драники из батата");
        assert!(recipe.validate().is_ok());
    }
}
