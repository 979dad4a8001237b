//! Free-text line matching.
//!
//! Order, delivery, and purchase lines carry free-form description text with
//! no foreign key into the catalog; matching is a deliberately loose
//! compatibility layer over that text. The `Matcher` trait keeps the policy
//! swappable; engines persist the resolved item id on first success so the
//! fuzzy path only runs for unlinked legacy lines.

use std::sync::Arc;

use crate::item::CatalogItem;

/// Resolves a line's description text to at most one catalog item.
///
/// "No match" is a normal outcome, not an error: callers must treat unmatched
/// lines as non-trackable (fully reservable, no stock effect) unless policy
/// says otherwise.
pub trait Matcher: Send + Sync {
    fn resolve<'a>(&self, text: &str, items: &'a [CatalogItem]) -> Option<&'a CatalogItem>;
}

impl<M> Matcher for Arc<M>
where
    M: Matcher + ?Sized,
{
    fn resolve<'a>(&self, text: &str, items: &'a [CatalogItem]) -> Option<&'a CatalogItem> {
        (**self).resolve(text, items)
    }
}

/// The legacy matching rule: case-insensitive substring search, primary names
/// first, secondary detail text only when no name matched.
///
/// An item matches when its name (or detail) contains the line text. Blank
/// line text matches nothing; a blank needle would otherwise match every
/// item and silently bind the line to an arbitrary one.
#[derive(Debug, Default, Clone, Copy)]
pub struct SubstringMatcher;

impl SubstringMatcher {
    pub fn new() -> Self {
        Self
    }
}

impl Matcher for SubstringMatcher {
    fn resolve<'a>(&self, text: &str, items: &'a [CatalogItem]) -> Option<&'a CatalogItem> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }

        items
            .iter()
            .find(|item| item.name.to_lowercase().contains(&needle))
            .or_else(|| {
                items
                    .iter()
                    .find(|item| item.detail.to_lowercase().contains(&needle))
            })
    }
}

/// Normalized form for joining lines across documents by description text:
/// trimmed, case-folded. Two lines refer to the same ordered thing exactly
/// when their keys are equal.
pub fn description_key(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Strip the display decoration a purchase line picks up when composed from a
/// shortage backlog: a leading `[Label] ` group and a trailing `(SO: ...)`
/// annotation. The remainder is what the line looked like on the original
/// order, which is what matching has to run against.
pub fn clean_received_description(text: &str) -> &str {
    let mut s = text.trim();

    if s.starts_with('[') {
        if let Some(end) = s.find("] ") {
            s = s[end + 2..].trim_start();
        }
    }

    if let Some(idx) = s.rfind("(SO:") {
        s = s[..idx].trim_end();
    }

    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemKind;

    fn catalog() -> Vec<CatalogItem> {
        vec![
            CatalogItem::new("Bolt M6", "Hex bolt, stainless, 6mm", ItemKind::Goods),
            CatalogItem::new("Bolt M8", "Hex bolt, stainless, 8mm", ItemKind::Goods),
            CatalogItem::new("Assembly service", "On-site assembly, per hour", ItemKind::Service),
        ]
    }

    #[test]
    fn matches_name_case_insensitively() {
        let items = catalog();
        let hit = SubstringMatcher.resolve("bolt m8", &items).unwrap();
        assert_eq!(hit.name, "Bolt M8");
    }

    #[test]
    fn first_name_match_wins_on_ambiguous_text() {
        let items = catalog();
        let hit = SubstringMatcher.resolve("Bolt", &items).unwrap();
        assert_eq!(hit.name, "Bolt M6");
    }

    #[test]
    fn falls_back_to_detail_only_when_no_name_matches() {
        let items = catalog();
        let hit = SubstringMatcher.resolve("stainless, 8mm", &items).unwrap();
        assert_eq!(hit.name, "Bolt M8");
        // "assembly" exists in both a name and another item's detail; the
        // name pass must win.
        let hit = SubstringMatcher.resolve("assembly", &items).unwrap();
        assert_eq!(hit.name, "Assembly service");
    }

    #[test]
    fn unmatched_and_blank_text_resolve_to_none() {
        let items = catalog();
        assert!(SubstringMatcher.resolve("gasket", &items).is_none());
        assert!(SubstringMatcher.resolve("   ", &items).is_none());
    }

    #[test]
    fn description_keys_fold_case_and_whitespace() {
        assert_eq!(description_key("  Bolt M6 "), "bolt m6");
        assert_eq!(description_key("BOLT M6"), description_key("bolt m6"));
        assert_ne!(description_key("Bolt M6"), description_key("Bolt M8"));
    }

    #[test]
    fn cleaning_strips_label_prefix_and_order_suffix() {
        assert_eq!(
            clean_received_description("[Steel] Bolt M6 (SO: S00042)"),
            "Bolt M6"
        );
        assert_eq!(clean_received_description("[Steel] Bolt M6"), "Bolt M6");
        assert_eq!(clean_received_description("Bolt M6 (SO: S00042)"), "Bolt M6");
        assert_eq!(clean_received_description("Bolt M6"), "Bolt M6");
    }

    #[test]
    fn cleaning_leaves_inner_brackets_alone() {
        assert_eq!(
            clean_received_description("Bracket [left] mount"),
            "Bracket [left] mount"
        );
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: display decoration is fully reversible. A line
            /// description wrapped in a `[Label] ` prefix and an `(SO: ...)`
            /// suffix cleans back to the original text.
            #[test]
            fn decorated_description_cleans_back_to_original(
                label in "[A-Za-z0-9 ]{0,20}",
                name in "[A-Za-z0-9][A-Za-z0-9 ]{0,40}",
                so_ref in "[A-Z0-9]{1,10}",
            ) {
                let decorated = format!("[{label}] {name} (SO: {so_ref})");
                prop_assert_eq!(clean_received_description(&decorated), name.trim());
            }

            /// Property: undecorated text passes through untouched (modulo
            /// surrounding whitespace).
            #[test]
            fn plain_description_is_untouched(text in "[A-Za-z0-9 ,.-]{0,60}") {
                prop_assert_eq!(clean_received_description(&text), text.trim());
            }
        }
    }
}
