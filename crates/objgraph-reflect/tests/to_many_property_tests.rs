use objgraph_model::{DataObject, ObjectId, Value};
use objgraph_reflect::Property;
use proptest::prelude::*;

fn painting(n: u8) -> ObjectId {
    ObjectId::permanent("Painting", "ID", i64::from(n))
}

fn as_value(n: Option<u8>) -> Value {
    n.map(painting).into()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 96,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    /// A sequence of single-value writes behaves like remove-then-add on a
    /// duplicate-free list.
    #[test]
    fn to_many_writes_keep_a_duplicate_free_collection(
        ops in prop::collection::vec((prop::option::of(0u8..8), prop::option::of(0u8..8)), 0..40)
    ) {
        let property = Property::map_to_many("paintings", "Painting", Some("artist"));
        let mut object = DataObject::new("Artist");
        property.prepare_for_access(&mut object).expect("prepare");

        let mut model: Vec<ObjectId> = Vec::new();
        for (old, new) in ops {
            property
                .write_value(&mut object, &as_value(old), as_value(new))
                .expect("write");

            if let Some(old) = old {
                let old = painting(old);
                model.retain(|id| *id != old);
            }
            if let Some(new) = new {
                let new = painting(new);
                if !model.contains(&new) {
                    model.push(new);
                }
            }
        }

        prop_assert_eq!(object.value("paintings"), Some(&Value::Objects(model)));
    }

    /// Preparing an already-populated collection never changes it.
    #[test]
    fn prepare_for_access_is_idempotent(ids in prop::collection::btree_set(0u8..32, 0..10)) {
        let property = Property::map_to_many("paintings", "Painting", None);
        let ids: Vec<ObjectId> = ids.into_iter().map(painting).collect();
        let mut object = DataObject::new("Artist").with_value("paintings", ids.clone());

        property.prepare_for_access(&mut object).expect("first prepare");
        property.prepare_for_access(&mut object).expect("second prepare");

        prop_assert_eq!(object.value("paintings"), Some(&Value::Objects(ids)));
    }
}
