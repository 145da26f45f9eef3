use crate::catalog::policy::SelectionPolicy;
use crate::models::catalog::CatalogItem;

/// Returns the rows a requester may see.
///
/// VIP requesters get the whole catalog narrowed by `search`. Everyone else
/// gets the policy's subset, and only then is `search` applied, so searching
/// can never reach rows outside the free subset.
pub fn visible_rows(
    catalog: &[CatalogItem],
    entitled: bool,
    search: Option<&str>,
    policy: &dyn SelectionPolicy,
) -> Vec<CatalogItem> {
    let needle = search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let eligible = if entitled {
        catalog.to_vec()
    } else {
        policy.select(catalog)
    };

    match needle {
        Some(needle) => eligible
            .into_iter()
            .filter(|item| item.matches(&needle))
            .collect(),
        None => eligible,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::policy::{PrefixPolicy, QuotaPolicy};
    use crate::test_support::catalog_item;

    fn catalog() -> Vec<CatalogItem> {
        (1..=100)
            .map(|i| {
                let model = if i % 2 == 0 {
                    format!("iPhone {i}")
                } else {
                    format!("Moto G{i}")
                };
                catalog_item(i, &model, &format!("Compatible with {model} Plus"))
            })
            .collect()
    }

    #[test]
    fn test_vip_sees_everything() {
        let rows = visible_rows(&catalog(), true, None, &PrefixPolicy { limit: 10 });
        assert_eq!(rows.len(), 100);
    }

    #[test]
    fn test_vip_search_matches_model_or_compatibility_case_insensitively() {
        let rows = visible_rows(&catalog(), true, Some("  IPHONE 9"), &PrefixPolicy { limit: 10 });
        // iPhone 90, 92, 94, 96, 98
        assert!(rows.iter().all(|r| r.model_name.starts_with("iPhone 9")));
        assert_eq!(rows.len(), 5);
    }

    #[test]
    fn test_non_vip_is_capped_for_every_search_term() {
        let policy = QuotaPolicy::brands(49);
        let catalog = catalog();
        for term in [None, Some(""), Some("iphone"), Some("moto"), Some("99"), Some("zzz")] {
            let rows = visible_rows(&catalog, false, term, &policy);
            assert!(rows.len() <= 49);
            if let Some(term) = term.filter(|t| !t.is_empty()) {
                assert!(rows.iter().all(|r| r.matches(&term.to_lowercase())));
            }
        }
    }

    #[test]
    fn test_non_vip_search_cannot_reach_rows_outside_the_subset() {
        let policy = PrefixPolicy { limit: 10 };
        // Row 100 exists, but only rows 1..=10 are eligible
        let rows = visible_rows(&catalog(), false, Some("iPhone 100"), &policy);
        assert!(rows.is_empty());
    }
}
