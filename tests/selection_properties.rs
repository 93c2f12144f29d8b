//! Property tests for the selection cascade and query-key identity.

use leasehold::query::{build_key, KeyPart, LocalFilters};
use leasehold::selection::{MemoryStorage, Role, Selection, SelectionStore};
use proptest::prelude::*;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Op {
    Agent(Option<String>),
    Landlord(Option<String>),
    Property(Option<String>),
    Clear,
}

fn id() -> impl Strategy<Value = Option<String>> {
    proptest::option::of("[1-3]")
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        id().prop_map(Op::Agent),
        id().prop_map(Op::Landlord),
        id().prop_map(Op::Property),
        Just(Op::Clear),
    ]
}

#[derive(Debug, Clone)]
enum Filter {
    Search(String),
    Status(String),
    Extra(String, String),
}

fn apply(filters: LocalFilters, filter: &Filter) -> LocalFilters {
    match filter {
        Filter::Search(text) => filters.search(text.clone()),
        Filter::Status(status) => filters.status(status.clone()),
        Filter::Extra(name, value) => filters.with(name.clone(), value.clone()),
    }
}

/// The same filters in two insertion orders
fn shuffled_filters() -> impl Strategy<Value = (Vec<Filter>, Vec<Filter>)> {
    (
        "[a-z ]{0,6}",
        prop_oneof![Just("all".to_string()), "[a-z]{1,6}"],
        proptest::collection::btree_map("(unit|type|floor|landlordId|agentId|status)", "[a-z0-9]{0,4}", 0..4),
    )
        .prop_flat_map(|(search, status, extras)| {
            let mut filters = vec![Filter::Search(search), Filter::Status(status)];
            filters.extend(extras.into_iter().map(|(name, value)| Filter::Extra(name, value)));
            (Just(filters.clone()), Just(filters).prop_shuffle())
        })
}

fn role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Admin), Just(Role::Agent), Just(Role::Client), Just(Role::Tenant)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn cascade_holds_for_any_setter_sequence(ops in proptest::collection::vec(op(), 1..40)) {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = SelectionStore::load(storage.clone());

        for op in &ops {
            let before = store.selection().clone();
            match op {
                Op::Agent(id) => {
                    store.set_agent_id(id.as_deref()).unwrap();
                    let after = store.selection();
                    prop_assert_eq!(&after.agent_id, id);
                    if *id != before.agent_id {
                        prop_assert_eq!(&after.landlord_id, &None);
                        prop_assert_eq!(&after.property_id, &None);
                    } else {
                        prop_assert_eq!(after, &before);
                    }
                }
                Op::Landlord(id) => {
                    store.set_landlord_id(id.as_deref()).unwrap();
                    let after = store.selection();
                    prop_assert_eq!(&after.landlord_id, id);
                    prop_assert_eq!(&after.agent_id, &before.agent_id);
                    if *id != before.landlord_id {
                        prop_assert_eq!(&after.property_id, &None);
                    } else {
                        prop_assert_eq!(&after.property_id, &before.property_id);
                    }
                }
                Op::Property(id) => {
                    store.set_property_id(id.as_deref()).unwrap();
                    let after = store.selection();
                    prop_assert_eq!(&after.property_id, id);
                    prop_assert_eq!(&after.landlord_id, &before.landlord_id);
                    prop_assert_eq!(&after.agent_id, &before.agent_id);
                }
                Op::Clear => {
                    store.clear_filters().unwrap();
                    prop_assert!(store.selection().is_empty());
                }
            }

            let restored = SelectionStore::load(storage.clone());
            prop_assert_eq!(restored.selection(), store.selection());
        }
    }

    #[test]
    fn key_ignores_filter_insertion_order(
        (first, second) in shuffled_filters(),
        role in role(),
        agent in id(),
        landlord in id(),
        property in id(),
    ) {
        let selection = Selection::new(agent.as_deref(), landlord.as_deref(), property.as_deref());
        let a = first.iter().fold(LocalFilters::new(), apply);
        let b = second.iter().fold(LocalFilters::new(), apply);

        let ka = build_key("/api/invoices", &selection, role, &a);
        let kb = build_key("/api/invoices", &selection, role, &b);
        prop_assert_eq!(&ka, &kb);
        prop_assert_eq!(ka.request_path(), kb.request_path());

        if !role.is_administrative() {
            prop_assert!(!ka.parts().iter().any(|p| matches!(p, KeyPart::Agent(_) | KeyPart::Landlord(_))));
        }
    }
}
