//! Property-based tests for fogbugz-mcp
//!
//! These tests verify invariants that must hold for all inputs:
//! - Rewritten attachment links never carry a session ticket
//! - Column sets always include the defaults, without duplicates
//! - The user-story alias is idempotent
//! - Outlines place every case exactly once
//! - The people cache only refetches when empty or forced
//!
//! Run with: cargo test --test property_tests

use proptest::prelude::*;

// ============================================================================
// ATTACHMENT URL TESTS
// ============================================================================

mod attachment_tests {
    use super::*;
    use fogbugz_mcp::attachments::build_attachment_download_url;
    use url::Url;

    const BASE: &str = "https://example.fogbugz.com";

    fn attachment_url() -> impl Strategy<Value = String> {
        (
            "[a-z]{1,8}",
            proptest::collection::vec(("[a-z]{1,8}", "[a-z0-9]{0,8}"), 0..5),
            "[a-zA-Z0-9]{1,12}",
            any::<bool>(),
        )
            .prop_map(|(page, params, ticket, amp)| {
                let sep = if amp { "&amp;" } else { "&" };
                let mut query: Vec<String> =
                    params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                query.push(format!("sTicket={}", ticket));
                format!("{}.asp?{}", page, query.join(sep))
            })
    }

    proptest! {
        /// Invariant: no sTicket survives, with or without a base URL
        #[test]
        fn ticket_always_removed(url in attachment_url(), token in "[a-z0-9]{0,16}") {
            let resolved = build_attachment_download_url(&url, Some(BASE), Some(token.as_str()));
            let parsed = Url::parse(&resolved).unwrap();
            prop_assert!(parsed.query_pairs().all(|(k, _)| k != "sTicket"));

            let unresolved = build_attachment_download_url(&url, None, Some(token.as_str()));
            prop_assert!(!unresolved.contains("sTicket"));
        }

        /// Invariant: a non-empty token is always present exactly once
        #[test]
        fn token_present_when_given(url in attachment_url(), token in "[a-z0-9]{1,16}") {
            let resolved = build_attachment_download_url(&url, Some(BASE), Some(token.as_str()));
            let tokens: Vec<String> = Url::parse(&resolved)
                .unwrap()
                .query_pairs()
                .filter(|(k, _)| k == "token")
                .map(|(_, v)| v.into_owned())
                .collect();
            prop_assert_eq!(tokens, vec![token]);
        }

        /// Invariant: rewriting never panics on arbitrary input
        #[test]
        fn never_panics(url in "\\PC{0,80}", base in "\\PC{0,40}") {
            let _ = build_attachment_download_url(&url, Some(base.as_str()), Some("t"));
        }
    }
}

// ============================================================================
// COLUMN SET TESTS
// ============================================================================

mod column_tests {
    use super::*;
    use fogbugz_mcp::normalize::{add_column, columns_with_defaults, DEFAULT_COLS};
    use std::collections::HashSet;

    proptest! {
        /// Invariant: every default column is present, defaults first
        #[test]
        fn defaults_are_a_prefix(cols in "[a-zA-Z_, ]{0,60}") {
            let result = columns_with_defaults(Some(cols.as_str()));
            let parts: Vec<&str> = result.split(',').collect();
            prop_assert_eq!(&parts[..DEFAULT_COLS.len()], DEFAULT_COLS);
        }

        /// Invariant: no column appears twice and none is empty
        #[test]
        fn no_duplicates(cols in proptest::collection::vec("[a-zA-Z]{1,6}|ixBug|sTitle", 0..10)) {
            let joined = cols.join(" , ");
            let result = columns_with_defaults(Some(joined.as_str()));
            let parts: Vec<&str> = result.split(',').collect();
            let unique: HashSet<&str> = parts.iter().copied().collect();
            prop_assert_eq!(unique.len(), parts.len());
            prop_assert!(parts.iter().all(|p| !p.is_empty()));
        }

        /// Invariant: adding a column twice is the same as adding it once
        #[test]
        fn add_column_idempotent(column in "[a-zA-Z]{1,10}") {
            let base = columns_with_defaults(None);
            let once = add_column(&base, &column);
            prop_assert_eq!(add_column(&once, &column), once);
        }
    }
}

// ============================================================================
// USER STORY ALIAS TESTS
// ============================================================================

mod user_story_tests {
    use super::*;
    use fogbugz_mcp::normalize::{with_user_story, USER_STORY_FIELD};
    use serde_json::json;

    proptest! {
        /// Invariant: the alias mirrors the raw field and a second pass changes nothing
        #[test]
        fn alias_mirrors_and_is_idempotent(story in "\\PC{0,40}", title in "\\PC{0,20}") {
            let mut record = json!({ "sTitle": title });
            record[USER_STORY_FIELD] = json!(story);
            let once = with_user_story(record);
            prop_assert_eq!(&once["userStory"], &json!(story));
            prop_assert_eq!(&once[USER_STORY_FIELD], &json!(story));
            prop_assert_eq!(with_user_story(once.clone()), once);
        }
    }
}

// ============================================================================
// OUTLINE TESTS
// ============================================================================

mod outline_tests {
    use super::*;
    use fogbugz_mcp::outline::{build_outline, OutlineNode};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn collect(node: &OutlineNode, parent: Option<i64>, seen: &mut HashMap<i64, Option<i64>>) {
        assert!(seen.insert(node.ix_bug, parent).is_none(), "case {} placed twice", node.ix_bug);
        for child in &node.children {
            collect(child, Some(node.ix_bug), seen);
        }
    }

    proptest! {
        /// Invariant: every case appears exactly once, under its parent when
        /// the parent is in the result, otherwise as a forest root
        #[test]
        fn every_case_placed_once(
            links in proptest::collection::vec((1i64..40, 0i64..40), 0..30),
            requested in 1i64..40,
        ) {
            let cases: Vec<Value> = links
                .iter()
                .map(|(id, parent)| json!({"ixBug": id.to_string(), "ixBugParent": parent.to_string()}))
                .collect();
            let refs: Vec<&Value> = cases.iter().collect();
            let outline = build_outline(&refs, requested);

            let mut seen = HashMap::new();
            for root in &outline.forest {
                collect(root, None, &mut seen);
            }
            prop_assert_eq!(seen.len(), outline.total);

            // Last occurrence of an id wins
            let parents: HashMap<i64, i64> = links.iter().copied().collect();
            prop_assert_eq!(seen.len(), parents.len());
            for (id, placed_under) in &seen {
                if let Some(parent) = placed_under {
                    prop_assert_eq!(parents[id], *parent);
                }
            }
        }
    }
}

// ============================================================================
// RICH TEXT TESTS
// ============================================================================

mod rich_text_tests {
    use super::*;
    use fogbugz_mcp::normalize::apply_text_type;
    use fogbugz_mcp::types::TextType;

    proptest! {
        /// Invariant: plain text passes through untouched and is never rich
        #[test]
        fn plain_is_identity(text in "\\PC{0,80}") {
            let result = apply_text_type(Some(TextType::Plain), Some(text.as_str()), None);
            prop_assert!(!result.is_rich());
            prop_assert_eq!(result.event_text.as_deref(), Some(text.as_str()));
        }

        /// Invariant: bold markdown always renders as <strong>
        #[test]
        fn markdown_bold_renders(word in "[a-zA-Z]{1,12}") {
            let text = format!("**{}**", word);
            let result = apply_text_type(Some(TextType::Markdown), Some(text.as_str()), None);
            prop_assert!(result.is_rich());
            let expected = format!("<strong>{}</strong>", word);
            prop_assert!(result.event_text.unwrap().contains(&expected));
        }
    }
}

// ============================================================================
// PEOPLE DIRECTORY TESTS
// ============================================================================

mod people_tests {
    use super::*;
    use fogbugz_mcp::people::{matches_person, PeopleCache};
    use fogbugz_mcp::FogbugzError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    proptest! {
        /// Invariant: while fresh, only the first lookup and forced refreshes fetch
        #[test]
        fn fetches_only_when_empty_or_forced(forces in proptest::collection::vec(any::<bool>(), 1..12)) {
            let cache = PeopleCache::new(Duration::from_secs(300));
            let fetches = AtomicUsize::new(0);

            for (i, force) in forces.iter().copied().enumerate() {
                let counter = &fetches;
                let lookup = tokio_test::block_on(cache.get_or_fetch(force, move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, FogbugzError>(vec![json!({"ixPerson": 1, "sFullName": "Ada"})])
                }))
                .unwrap();
                prop_assert_eq!(lookup.from_cache, i > 0 && !force);
                prop_assert_eq!(lookup.snapshot.people.len(), 1);
            }

            let expected = 1 + forces.iter().skip(1).filter(|f| **f).count();
            prop_assert_eq!(fetches.load(Ordering::SeqCst), expected);
        }

        /// Invariant: any slice of a name finds the person, in any letter case
        #[test]
        fn name_slice_matches(name in "[A-Za-z]{1,20}", a in 0usize..20, b in 0usize..20) {
            let (start, end) = (a.min(b) % name.len(), a.max(b) % name.len() + 1);
            let end = end.max(start + 1);
            let needle = name[start..end].to_lowercase();
            let person = json!({"ixPerson": 7, "sFullName": name.to_uppercase()});
            prop_assert!(matches_person(&person, &needle));
        }
    }
}
