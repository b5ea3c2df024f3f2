use docevent_schema::{EventDecl, EventTypeId, Schema, SchemaLoadError, TypeSet};
use proptest::prelude::*;
use std::io::Write;

fn type_set() -> impl Strategy<Value = TypeSet> {
    proptest::collection::btree_set(0u32..16, 0..8)
        .prop_map(|ids| ids.into_iter().map(EventTypeId::new).collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn intersection_is_subset_of_both(a in type_set(), b in type_set()) {
        let both = a.intersection(&b);
        prop_assert!(both.is_subset(&a));
        prop_assert!(both.is_subset(&b));
        prop_assert_eq!(both.is_empty(), a.is_disjoint(&b));
    }

    #[test]
    fn narrowing_never_grows(roles in proptest::collection::vec("[A-D]", 1..6)) {
        let schema = Schema::from_decls(vec![
            EventDecl::new("E1", vec!["T1", "A"], vec!["T1", "A", "B"], vec![("T1", "A")]),
            EventDecl::new("E2", vec!["T2"], vec!["T2", "B", "C"], vec![]),
            EventDecl::new("E3", vec!["T3", "D"], vec!["T3", "A", "D"], vec![]),
        ]).expect("schema");

        let mut types = schema.all_types();
        for role in &roles {
            let narrowed = schema.narrow(&types, role);
            prop_assert!(narrowed.is_subset(&types));
            types = narrowed;
        }
    }
}

#[test]
fn loads_schema_from_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("schema.json");
    let mut file = std::fs::File::create(&path).expect("create");
    write!(
        file,
        r#"{{"EquityRepurchase": {{"primary_args": ["RepurchaseTrigger", "CompanyName"],
            "args": ["RepurchaseTrigger", "CompanyName", "RepurchasedShares"],
            "event_relations": [["RepurchaseTrigger", "CompanyName"]]}}}}"#
    )
    .expect("write");

    let schema = Schema::load(&path).expect("load");
    assert_eq!(schema.len(), 1);
    let decl = schema.decl_by_name("EquityRepurchase").expect("decl");
    assert_eq!(decl.trigger_role(), "RepurchaseTrigger");
    assert!(decl.args.contains("RepurchasedShares"));
}

#[test]
fn truncated_file_is_a_json_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("schema.json");
    std::fs::write(&path, "{\"A\": {\"primary_args\": [\"T\"]").expect("write");
    assert!(matches!(Schema::load(&path), Err(SchemaLoadError::Json(_))));
}
