//! Host filter properties: partition, idempotence, complement.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use switchpush::inventory::{Defaults, Group, HostDef, HostFilter, HostSet, Inventory};

const GROUPS: [&str; 3] = ["cisco_nxos", "arista_eos", "juniper_junos"];

/// One host per entry, each a direct member of `GROUPS[entry]`.
fn inventory_with(assignments: &[usize]) -> Inventory {
    let groups = GROUPS
        .iter()
        .map(|g| Group::new(*g).with_parent("fabric"))
        .chain(std::iter::once(Group::new("fabric")))
        .collect();
    let hosts = assignments
        .iter()
        .enumerate()
        .map(|(i, g)| HostDef::new(format!("sw{:03}", i)).with_group(GROUPS[*g]))
        .collect();
    Inventory::from_parts(hosts, groups, Defaults::default()).unwrap()
}

fn sorted_names(set: &HostSet) -> Vec<String> {
    let mut names: Vec<String> = set.names().into_iter().map(String::from).collect();
    names.sort();
    names
}

proptest! {
    #[test]
    fn prop_groups_partition_hosts(assignments in prop::collection::vec(0usize..3, 0..40)) {
        let inventory = inventory_with(&assignments);
        let all = inventory.hosts();

        let parts: Vec<HostSet> = GROUPS
            .iter()
            .map(|g| inventory.filter(&HostFilter::group(*g)))
            .collect();

        let total: usize = parts.iter().map(HostSet::len).sum();
        prop_assert_eq!(total, all.len());

        for (i, a) in parts.iter().enumerate() {
            for b in parts.iter().skip(i + 1) {
                prop_assert!(a.intersection(b).is_empty());
            }
        }

        let union = parts.iter().fold(HostSet::default(), |acc, p| acc.union(p));
        prop_assert_eq!(sorted_names(&union), sorted_names(&all));
    }

    #[test]
    fn prop_filter_is_idempotent(
        assignments in prop::collection::vec(0usize..3, 0..40),
        group in 0usize..3,
    ) {
        let inventory = inventory_with(&assignments);
        let filter = HostFilter::group(GROUPS[group]) | HostFilter::name("sw000");

        let once = inventory.filter(&filter);
        let twice = once.filter_by(&filter);
        prop_assert_eq!(once.names(), twice.names());
    }

    #[test]
    fn prop_filter_and_complement_cover_everything(
        assignments in prop::collection::vec(0usize..3, 0..40),
        group in 0usize..3,
    ) {
        let inventory = inventory_with(&assignments);
        let filter = HostFilter::group(GROUPS[group]);

        let selected = inventory.filter(&filter);
        let rest = inventory.filter(&!filter);

        prop_assert!(selected.intersection(&rest).is_empty());
        prop_assert_eq!(selected.len() + rest.len(), inventory.len());
    }
}

#[test]
fn test_group_tree_includes_every_child_group() {
    let inventory = inventory_with(&[0, 1, 2, 0]);
    assert_eq!(inventory.filter(&HostFilter::group_tree("fabric")).len(), 4);
    assert!(inventory.filter(&HostFilter::group("fabric")).is_empty());
}

#[test]
fn test_filter_preserves_declaration_order() {
    let inventory = inventory_with(&[1, 0, 1, 0, 1]);
    assert_eq!(
        inventory.filter(&HostFilter::group("arista_eos")).names(),
        vec!["sw000", "sw002", "sw004"]
    );
}

#[test]
fn test_closure_filter_on_host_set() {
    let hosts = host_set(&["leaf01", "leaf02", "spine01"]);
    let leaves = hosts.filter(|h| h.name.starts_with("leaf"));
    assert_eq!(leaves.names(), vec!["leaf01", "leaf02"]);
    assert_eq!(hosts.difference(&leaves).names(), vec!["spine01"]);
}

#[test]
fn test_composed_filter_display() {
    let filter = HostFilter::group("cisco_nxos") & !HostFilter::platform("eos");
    assert_eq!(filter.to_string(), "(group=cisco_nxos & !platform=eos)");
}
