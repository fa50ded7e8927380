//! Standard assertion helpers for tests

use epconf_core::{ConfigError, ConfigResult};
use epconf_tree::{ConfigTree, RecordView};

/// Assert that a tree (or manager) passes the tree/registry invariant check
#[macro_export]
macro_rules! assert_consistent {
    ($tree:expr) => {
        if let Err(violation) = $tree.check_consistency() {
            panic!("tree invariant violated: {violation}");
        }
    };
}

/// Assert that the registry holds exactly the identifiers reachable from the root
pub fn assert_registry_matches_tree(tree: &ConfigTree) {
    let mut reachable = Vec::new();
    tree.root_view().collect_ids(&mut reachable);
    reachable.sort();
    let mut registered: Vec<_> = tree.registry().ids().copied().collect();
    registered.sort();
    assert_eq!(
        reachable, registered,
        "registry does not match the identifiers reachable from the root"
    );
}

/// Assert that a rejected delta left the tree exactly as it was
pub fn assert_rejected_unchanged<T: std::fmt::Debug>(
    before: &RecordView,
    tree: &ConfigTree,
    result: ConfigResult<T>,
) -> ConfigError {
    let err = match result {
        Ok(value) => panic!("expected rejection, got {value:?}"),
        Err(err) => err,
    };
    assert_eq!(before, tree.root_view().as_ref(), "rejected delta mutated the tree");
    assert_registry_matches_tree(tree);
    err
}
