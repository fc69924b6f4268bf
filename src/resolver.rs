// src/resolver.rs
//! Dependency correction for requested layer sets.

use crate::layers::{descriptor, LayerId, MAX_LAYER, MIN_LAYER};
use serde::Serialize;
use std::collections::BTreeSet;

/// Corrected, dependency-closed execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub ordered: Vec<LayerId>,
    pub warnings: Vec<String>,
    pub auto_added: Vec<LayerId>,
}

/// Issue category to the layer that fixes it.
const CATEGORY_LAYERS: &[(&str, LayerId)] = &[
    ("configuration", 1),
    ("patterns", 2),
    ("components", 3),
    ("hydration", 4),
    ("routing", 5),
    ("testing", 6),
];

/// Computes the execution order for `requested`.
///
/// Unknown ids are dropped with a warning. Missing dependencies are pulled in
/// transitively and reported. The result is ascending, which is a valid
/// topological order because dependencies always point at lower ids.
#[must_use]
pub fn resolve(requested: &[LayerId]) -> Resolution {
    let mut warnings = Vec::new();
    let mut wanted = BTreeSet::new();

    for &id in requested {
        if descriptor(id).is_some() {
            wanted.insert(id);
        } else {
            warnings.push(format!(
                "Unknown layer {id} ignored (valid layers are {MIN_LAYER}-{MAX_LAYER})"
            ));
        }
    }

    let mut closed = wanted.clone();
    let mut frontier: Vec<LayerId> = wanted.iter().copied().collect();
    let mut required_by: Vec<(LayerId, LayerId)> = Vec::new();

    while let Some(id) = frontier.pop() {
        let Some(desc) = descriptor(id) else {
            continue;
        };
        for &dep in desc.dependencies {
            if closed.insert(dep) {
                required_by.push((dep, id));
                frontier.push(dep);
            }
        }
    }

    required_by.sort_unstable();
    for (dep, by) in &required_by {
        let dep_name = descriptor(*dep).map_or("?", |d| d.name);
        let by_name = descriptor(*by).map_or("?", |d| d.name);
        warnings.push(format!(
            "Layer {dep} ({dep_name}) auto-added: required by layer {by} ({by_name})"
        ));
    }

    Resolution {
        ordered: closed.into_iter().collect(),
        warnings,
        auto_added: required_by.into_iter().map(|(dep, _)| dep).collect(),
    }
}

/// Base layer for an issue category, if the category is known.
#[must_use]
pub fn layer_for_category(category: &str) -> Option<LayerId> {
    CATEGORY_LAYERS
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, id)| *id)
}

/// Smallest dependency-closed layer list that fixes `categories`.
#[must_use]
pub fn minimal_set_for<'a, I>(categories: I) -> Vec<LayerId>
where
    I: IntoIterator<Item = &'a str>,
{
    let base: Vec<LayerId> = categories
        .into_iter()
        .filter_map(layer_for_category)
        .collect();
    resolve(&base).ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn layer_four_pulls_in_its_chain() {
        let r = resolve(&[4]);
        assert_eq!(r.ordered, vec![1, 2, 3, 4]);
        assert_eq!(r.auto_added, vec![1, 2, 3]);
        assert_eq!(r.warnings.len(), 3);
        assert!(r.warnings[0].contains("required by layer"));
    }

    #[test]
    fn unknown_ids_are_dropped_with_warning() {
        let r = resolve(&[0, 2, 9]);
        assert_eq!(r.ordered, vec![1, 2]);
        assert_eq!(r.auto_added, vec![1]);
        assert_eq!(
            r.warnings.iter().filter(|w| w.starts_with("Unknown layer")).count(),
            2
        );
    }

    #[test]
    fn duplicates_collapse() {
        let r = resolve(&[3, 3, 1, 1]);
        assert_eq!(r.ordered, vec![1, 2, 3]);
        assert_eq!(r.auto_added, vec![2]);
    }

    #[test]
    fn empty_request_is_empty() {
        assert_eq!(resolve(&[]), Resolution::default());
    }

    #[test]
    fn minimal_set_maps_categories() {
        assert_eq!(minimal_set_for(["patterns"]), vec![1, 2]);
        assert_eq!(minimal_set_for(["testing", "nope"]), vec![1, 2, 3, 6]);
        assert!(minimal_set_for(["nope"]).is_empty());
    }

    fn closure_of(id: LayerId, acc: &mut BTreeSet<LayerId>) {
        if let Some(d) = descriptor(id) {
            for &dep in d.dependencies {
                if acc.insert(dep) {
                    closure_of(dep, acc);
                }
            }
        }
    }

    proptest! {
        #[test]
        fn resolve_is_idempotent(ids in proptest::collection::vec(0u32..10, 0..8)) {
            let once = resolve(&ids);
            let twice = resolve(&once.ordered);
            prop_assert_eq!(&twice.ordered, &once.ordered);
            prop_assert!(twice.auto_added.is_empty());
        }

        #[test]
        fn resolve_contains_transitive_closure(id in MIN_LAYER..=MAX_LAYER) {
            let r = resolve(&[id]);
            let mut expected = BTreeSet::from([id]);
            closure_of(id, &mut expected);
            prop_assert_eq!(r.ordered, expected.into_iter().collect::<Vec<_>>());
        }

        #[test]
        fn ordered_is_strictly_ascending(ids in proptest::collection::vec(0u32..10, 0..8)) {
            let r = resolve(&ids);
            prop_assert!(r.ordered.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
