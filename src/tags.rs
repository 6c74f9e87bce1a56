//! Cluster tag handling
//!
//! Desired tags come from `spec.tags`. Older resources carry them in a
//! free-text annotation instead, which is parsed here for compatibility.

use kube::ResourceExt;

use crate::crd::LkeClusterConfig;

/// Annotation holding comma/newline separated cluster tags
pub const TAGS_ANNOTATION: &str = "lke.anza-labs.dev/tags";

/// Split a free-text tag list on commas, CR and LF
///
/// Tokens are trimmed and empty tokens dropped.
pub fn extract_tags(raw: &str) -> Vec<String> {
    raw.split([',', '\r', '\n'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Tags the operator should enforce on the remote cluster
///
/// `None` means tags are unmanaged and existing remote tags are left alone.
pub fn desired_tags(cluster: &LkeClusterConfig) -> Option<Vec<String>> {
    if let Some(ref tags) = cluster.spec.tags {
        return Some(tags.clone());
    }

    cluster
        .annotations()
        .get(TAGS_ANNOTATION)
        .map(|raw| extract_tags(raw))
}

/// Compare desired against remote tags as sorted sets
///
/// Returns the sorted desired set when an update is needed.
pub fn diff_tags(desired: Option<&[String]>, remote: &[String]) -> Option<Vec<String>> {
    let mut desired = desired?.to_vec();
    desired.sort();
    desired.dedup();

    let mut remote = remote.to_vec();
    remote.sort();
    remote.dedup();

    (desired != remote).then_some(desired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{LkeClusterConfigSpec, SecretRef};
    use std::collections::BTreeMap;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    mod extract {
        use super::*;

        #[test]
        fn splits_on_every_delimiter() {
            let cases = [
                ("foo", vec!["foo"]),
                ("foo,bar,baz", vec!["foo", "bar", "baz"]),
                ("foo\nbar\nbaz", vec!["foo", "bar", "baz"]),
                ("foo\rbar\rbaz", vec!["foo", "bar", "baz"]),
                ("foo\r\nbar\r\nbaz", vec!["foo", "bar", "baz"]),
                ("foo\r\nbar,baz", vec!["foo", "bar", "baz"]),
            ];
            for (raw, expected) in cases {
                assert_eq!(extract_tags(raw), strings(&expected), "input {raw:?}");
            }
        }

        #[test]
        fn trims_whitespace() {
            assert_eq!(
                extract_tags("  foo , bar\t,\n baz  "),
                strings(&["foo", "bar", "baz"])
            );
        }

        #[test]
        fn delimiter_only_inputs_are_empty() {
            for raw in ["", ",,,,", "\r\r", "\n\n", "\r\n", " , \r\n "] {
                assert!(extract_tags(raw).is_empty(), "input {raw:?}");
            }
        }
    }

    mod diff {
        use super::*;

        #[test]
        fn equal_sets_need_no_update() {
            let desired = strings(&["foo"]);
            assert_eq!(diff_tags(Some(desired.as_slice()), &strings(&["foo"])), None);
        }

        #[test]
        fn order_does_not_matter() {
            let desired = strings(&["b", "a"]);
            assert_eq!(diff_tags(Some(desired.as_slice()), &strings(&["a", "b"])), None);
        }

        #[test]
        fn different_sets_stage_sorted_desired() {
            let desired = strings(&["foo", "bar"]);
            assert_eq!(
                diff_tags(Some(desired.as_slice()), &strings(&["baz"])),
                Some(strings(&["bar", "foo"]))
            );
        }

        #[test]
        fn unmanaged_tags_are_left_alone() {
            assert_eq!(diff_tags(None, &strings(&["baz"])), None);
        }

        #[test]
        fn empty_desired_clears_remote() {
            assert_eq!(diff_tags(Some(&[] as &[String]), &strings(&["baz"])), Some(vec![]));
        }
    }

    mod desired {
        use super::*;

        fn cluster(tags: Option<Vec<String>>, annotation: Option<&str>) -> LkeClusterConfig {
            let mut cluster = LkeClusterConfig::new(
                "prod",
                LkeClusterConfigSpec {
                    region: "us-east".to_string(),
                    token_secret_ref: SecretRef::default(),
                    high_availability: None,
                    node_pools: BTreeMap::new(),
                    kubernetes_version: None,
                    tags,
                },
            );
            if let Some(raw) = annotation {
                cluster
                    .annotations_mut()
                    .insert(TAGS_ANNOTATION.to_string(), raw.to_string());
            }
            cluster
        }

        #[test]
        fn typed_field_wins_over_annotation() {
            let c = cluster(Some(strings(&["typed"])), Some("annotated"));
            assert_eq!(desired_tags(&c), Some(strings(&["typed"])));
        }

        #[test]
        fn annotation_is_the_fallback() {
            let c = cluster(None, Some("foo,bar"));
            assert_eq!(desired_tags(&c), Some(strings(&["foo", "bar"])));
        }

        #[test]
        fn nothing_set_means_unmanaged() {
            assert_eq!(desired_tags(&cluster(None, None)), None);
        }
    }
}
