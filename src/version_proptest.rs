//! Property-based tests for version ordering.
//!
//! These tests generate versions from their components and check that the
//! ordering is a total order consistent with equality and hashing.

#[cfg(test)]
mod proptest_tests {
    use crate::version::Version;
    use proptest::prelude::*;
    use std::cmp::Ordering;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    /// Generates a raw version string with optional epoch, pre, post and dev
    /// segments.
    fn raw_version() -> impl Strategy<Value = String> {
        (
            prop::option::of(0u64..3),
            prop::collection::vec(0u64..12, 1..4),
            prop::option::of((prop::sample::select(vec!["a", "b", "rc"]), 0u64..4)),
            prop::option::of(0u64..3),
            prop::option::of(0u64..3),
        )
            .prop_map(|(epoch, release, pre, post, dev)| {
                let mut raw = String::new();
                if let Some(epoch) = epoch {
                    raw.push_str(&format!("{}!", epoch));
                }
                raw.push_str(
                    &release
                        .iter()
                        .map(u64::to_string)
                        .collect::<Vec<_>>()
                        .join("."),
                );
                if let Some((label, n)) = pre {
                    raw.push_str(&format!("{}{}", label, n));
                }
                if let Some(n) = post {
                    raw.push_str(&format!(".post{}", n));
                }
                if let Some(n) = dev {
                    raw.push_str(&format!(".dev{}", n));
                }
                raw
            })
    }

    fn hash_of(version: &Version) -> u64 {
        let mut hasher = DefaultHasher::new();
        version.hash(&mut hasher);
        hasher.finish()
    }

    proptest! {
        /// Property: every generated version parses and keeps its raw text
        #[test]
        fn generated_versions_parse(raw in raw_version()) {
            let version = Version::parse(&raw).unwrap();
            prop_assert_eq!(version.raw(), raw.as_str());
        }

        /// Property: comparison is antisymmetric
        #[test]
        fn ordering_is_antisymmetric(a in raw_version(), b in raw_version()) {
            let a = Version::parse(&a).unwrap();
            let b = Version::parse(&b).unwrap();
            prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
        }

        /// Property: comparison is transitive
        #[test]
        fn ordering_is_transitive(a in raw_version(), b in raw_version(), c in raw_version()) {
            let mut versions = [
                Version::parse(&a).unwrap(),
                Version::parse(&b).unwrap(),
                Version::parse(&c).unwrap(),
            ];
            versions.sort();
            prop_assert!(versions[0] <= versions[1]);
            prop_assert!(versions[1] <= versions[2]);
            prop_assert!(versions[0] <= versions[2]);
        }

        /// Property: Ordering::Equal agrees with Eq, and equal versions hash alike
        #[test]
        fn ordering_agrees_with_eq_and_hash(a in raw_version(), b in raw_version()) {
            let a = Version::parse(&a).unwrap();
            let b = Version::parse(&b).unwrap();
            prop_assert_eq!(a.cmp(&b) == Ordering::Equal, a == b);
            if a == b {
                prop_assert_eq!(hash_of(&a), hash_of(&b));
            }
        }

        /// Property: trailing zero release segments do not change the version
        #[test]
        fn trailing_zeros_are_insignificant(raw in raw_version()) {
            let version = Version::parse(&raw).unwrap();
            let split = raw.find(|c: char| c.is_ascii_alphabetic()).unwrap_or(raw.len());
            let padded = format!("{}.0{}", raw[..split].trim_end_matches('.'), &raw[split..]);
            prop_assert_eq!(Version::parse(&padded).unwrap(), version);
        }

        /// Property: a version is stable iff it has no pre, post or dev segment
        #[test]
        fn stability_matches_segments(raw in raw_version()) {
            let version = Version::parse(&raw).unwrap();
            let has_suffix = raw.contains(|c: char| c.is_ascii_alphabetic());
            prop_assert_eq!(version.is_stable(), !has_suffix);
        }

        /// Property: arbitrary input never panics the parser
        #[test]
        fn parse_never_panics(input in ".*") {
            let _ = Version::parse(&input);
        }
    }
}
