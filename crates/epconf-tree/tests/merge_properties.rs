//! Property tests for the delta merge engine

#![allow(clippy::unwrap_used)]

use epconf_core::{ConfigError, Delta, FieldOp, TargetIndex};
use epconf_testkit::strategies::{
    arb_config_record, arb_invalid_root_op, arb_record_id, arb_root_op,
};
use epconf_testkit::{assert_consistent, assert_registry_matches_tree, config_schema};
use epconf_tree::ConfigTree;
use proptest::prelude::*;

fn fresh_tree() -> ConfigTree {
    ConfigTree::new(config_schema()).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn full_resync_is_idempotent(record in arb_config_record()) {
        let mut tree = fresh_tree();
        let delta = Delta::full_resync(record);

        tree.apply_delta(&delta).unwrap();
        let first = tree.root_view().content();
        let first_count = tree.registry().len();

        tree.apply_delta(&delta).unwrap();
        prop_assert_eq!(tree.root_view().content(), first);
        prop_assert_eq!(tree.registry().len(), first_count);
        prop_assert_eq!(tree.node_count(), first_count);
        assert_consistent!(tree);
    }

    #[test]
    fn unregistered_target_is_rejected_unchanged(
        record in arb_config_record(),
        target in arb_record_id(),
        op in arb_root_op(),
    ) {
        let mut tree = fresh_tree();
        tree.apply_delta(&Delta::full_resync(record)).unwrap();
        prop_assume!(!tree.registry().contains(&target));

        let before = tree.root_view();
        let ids_before = tree.registry().len();
        let err = tree.apply_delta(&Delta::patch(target, vec![op])).unwrap_err();

        prop_assert_eq!(err, ConfigError::UnresolvedTarget(TargetIndex::Record(target)));
        prop_assert_eq!(tree.root_view(), before);
        prop_assert_eq!(tree.registry().len(), ids_before);
    }

    #[test]
    fn failed_patch_is_atomic(
        record in arb_config_record(),
        prefix in prop::collection::vec(arb_root_op(), 0..4),
        bad in arb_invalid_root_op(),
    ) {
        let mut tree = fresh_tree();
        tree.apply_delta(&Delta::full_resync(record)).unwrap();
        let before = tree.root_view();
        let nodes_before = tree.node_count();

        let mut ops = prefix;
        ops.push(bad);
        prop_assert!(tree.apply_delta(&Delta::patch(TargetIndex::Root, ops)).is_err());

        prop_assert_eq!(tree.root_view(), before);
        prop_assert_eq!(tree.node_count(), nodes_before);
        assert_consistent!(tree);
    }

    #[test]
    fn registry_tracks_reachable_records(
        record in arb_config_record(),
        batches in prop::collection::vec(prop::collection::vec(arb_root_op(), 1..4), 1..6),
    ) {
        let mut tree = fresh_tree();
        tree.apply_delta(&Delta::full_resync(record)).unwrap();
        for ops in batches {
            tree.apply_delta(&Delta::patch(TargetIndex::Root, ops)).unwrap();
            assert_consistent!(tree);
            assert_registry_matches_tree(&tree);
        }
    }

    #[test]
    fn nested_patch_only_touches_target(
        record in arb_config_record(),
        host in "[a-z]{1,8}",
    ) {
        let mut tree = fresh_tree();
        tree.apply_delta(&Delta::full_resync(record)).unwrap();
        let primary = tree.root_view().get_record("primary").unwrap().id();
        let limit = tree.root_view().get_int("limit");

        tree.apply_delta(&Delta::patch(primary, vec![FieldOp::set("host", host.as_str())]))
            .unwrap();

        let root = tree.root_view();
        prop_assert_eq!(root.get_int("limit"), limit);
        let primary_view = root.get_record("primary").unwrap();
        prop_assert_eq!(primary_view.id(), primary);
        prop_assert_eq!(primary_view.get_str("host"), Some(host.as_str()));
    }
}
