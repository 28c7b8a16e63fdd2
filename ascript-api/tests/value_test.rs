use ascript_api::errors::ActorError;
use ascript_api::value::{Mutability, Object, Value};

fn reachable(value: &Value, out: &mut Vec<Value>) {
    if let Value::Object(obj) = value {
        if out.iter().any(|seen| seen.same(value)) {
            return;
        }
        out.push(value.clone());
        for child in obj.values() {
            reachable(&child, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // a = freeze({x:5}); a.x = 7 on the mutable reference leaves the alias at 5
    #[test]
    fn test_freeze_alias_keeps_snapshot() {
        let v = Value::record([("x", Value::from(5))]);
        let f = v.freeze();

        v.set("x", Value::from(7)).unwrap();

        assert_eq!(f.get("x"), Value::from(5));
        assert_eq!(v.get("x"), Value::from(7));
        assert!(f.is_frozen());
        assert!(!v.is_frozen());
    }

    #[test]
    fn test_write_to_frozen_alias_fails() {
        let v = Value::record([("x", Value::from(5))]);
        let f = v.freeze();

        let err = f.set("x", Value::from(9)).unwrap_err();
        match err {
            ActorError::ImmutableWriteError { key, mutability } => {
                assert_eq!(key, "x");
                assert_eq!(mutability, Mutability::DeepFrozen);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(f.get("x"), Value::from(5));
    }

    #[test]
    fn test_freeze_is_top_level_only() {
        let inner = Value::record([("y", Value::from(1))]);
        let outer = Value::record([("inner", inner.clone())]);
        let frozen = outer.freeze();

        assert!(frozen.is_frozen());
        assert!(!frozen.is_deep_frozen());
        // Children keep their tag and stay shared
        assert!(frozen.get("inner").same(&inner));
        inner.set("y", Value::from(2)).unwrap();
        assert_eq!(frozen.get("inner").get("y"), Value::from(2));
    }

    #[test]
    fn test_freeze_returns_new_reference() {
        let v = Value::record([("x", Value::from(1))]);
        let f1 = v.freeze();
        let f2 = f1.freeze();

        assert!(!f1.same(&v));
        assert!(!f2.same(&f1));
        assert_eq!(f1, f2);
        assert!(f2.is_frozen());
    }

    #[test]
    fn test_deep_freeze_closure() {
        let v = Value::record([
            ("a", Value::record([("b", Value::array([Value::record([("c", Value::from(1))])]))])),
            ("list", Value::array([Value::from(1), Value::array([])])),
        ]);
        let frozen = v.deep_freeze();

        let mut nodes = Vec::new();
        reachable(&frozen, &mut nodes);
        assert_eq!(nodes.len(), 6);
        assert!(nodes.iter().all(Value::is_deep_frozen));

        // The source graph is untouched
        assert!(!v.is_frozen());
        assert!(!v.get("a").is_frozen());
    }

    #[test]
    fn test_deep_freeze_of_cycle_terminates() {
        let a = Object::record([("name", Value::from("a"))]);
        let b = Object::record([("name", Value::from("b"))]);
        a.set("next", Value::Object(b.clone())).unwrap();
        b.set("next", Value::Object(a.clone())).unwrap();

        let frozen = Value::Object(a).deep_freeze();
        let back = frozen.get("next").get("next");

        assert!(back.same(&frozen));
        assert!(frozen.get("next").is_deep_frozen());
    }

    #[test]
    fn test_shallow_unfreeze_shares_children() {
        let child = Value::record([("y", Value::from(1))]);
        let frozen = Value::record([("child", child.clone())]).freeze();

        let thawed = frozen.unfreeze(false);

        assert!(!thawed.is_frozen());
        assert!(!thawed.same(&frozen));
        assert!(thawed.get("child").same(&child));
    }

    #[test]
    fn test_deep_unfreeze_copies_children() {
        let child = Value::record([("y", Value::from(1))]);
        let frozen = Value::record([("child", child.clone())]).deep_freeze();

        let thawed = frozen.unfreeze(true);

        assert!(!thawed.get("child").same(&frozen.get("child")));
        assert_eq!(thawed.get("child"), frozen.get("child"));
        assert!(!thawed.get("child").is_frozen());
    }

    #[test]
    fn test_unfreeze_write_does_not_leak_into_frozen_source() {
        let frozen = Value::record([("x", Value::from(1))]).freeze();
        let thawed = frozen.unfreeze(false);

        thawed.set("x", Value::from(2)).unwrap();

        assert_eq!(frozen.get("x"), Value::from(1));
        assert_eq!(thawed.get("x"), Value::from(2));
    }

    #[test]
    fn test_primitives_are_immutable() {
        for value in [Value::Null, Value::from(1), Value::from("s"), Value::from(true)] {
            assert!(value.is_frozen());
            assert!(value.is_deep_frozen());
            assert_eq!(value.freeze(), value);
        }
        assert!(matches!(
            Value::from(1).set("x", Value::Null),
            Err(ActorError::TypeError(_))
        ));
    }
}
