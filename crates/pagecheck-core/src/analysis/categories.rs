use crate::report::{CATEGORY_ORDER, OTHER_CATEGORY, RawCategory};
use std::collections::{BTreeMap, HashMap};

/// Reverse map from check id to the category that owns it.
///
/// Categories are visited in the fixed order performance, accessibility,
/// best-practices, seo, then any remaining category keys alphabetically.
/// A check referenced by several categories belongs to the first one visited.
#[derive(Debug, Default)]
pub struct CategoryMembership {
    owners: HashMap<String, String>,
}

impl CategoryMembership {
    pub fn build(categories: &BTreeMap<String, RawCategory>) -> Self {
        let ordered = CATEGORY_ORDER
            .iter()
            .filter_map(|key| categories.get_key_value(*key))
            .chain(
                categories
                    .iter()
                    .filter(|(key, _)| !CATEGORY_ORDER.contains(&key.as_str())),
            );

        let mut owners = HashMap::new();
        for (category_id, category) in ordered {
            for audit_ref in &category.audit_refs {
                owners
                    .entry(audit_ref.id.clone())
                    .or_insert_with(|| category_id.clone());
            }
        }

        Self { owners }
    }

    /// Owning category of a check, or `other` when no category references it
    pub fn category_of(&self, check_id: &str) -> &str {
        self.owners
            .get(check_id)
            .map(String::as_str)
            .unwrap_or(OTHER_CATEGORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::AuditRef;

    fn category(refs: &[&str]) -> RawCategory {
        RawCategory {
            audit_refs: refs
                .iter()
                .map(|id| AuditRef {
                    id: id.to_string(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_unreferenced_checks_are_other() {
        let mut categories = BTreeMap::new();
        categories.insert("seo".to_string(), category(&["document-title"]));

        let membership = CategoryMembership::build(&categories);
        assert_eq!(membership.category_of("document-title"), "seo");
        assert_eq!(membership.category_of("screenshot-thumbnails"), "other");
    }

    #[test]
    fn test_shared_check_goes_to_first_fixed_category() {
        let mut categories = BTreeMap::new();
        // Alphabetically accessibility comes first, but performance leads the fixed order
        categories.insert("accessibility".to_string(), category(&["viewport"]));
        categories.insert("performance".to_string(), category(&["viewport"]));
        categories.insert("pwa".to_string(), category(&["viewport", "installable-manifest"]));

        let membership = CategoryMembership::build(&categories);
        assert_eq!(membership.category_of("viewport"), "performance");
        assert_eq!(membership.category_of("installable-manifest"), "pwa");
    }
}
