//! Structural equality used by `assert_equals`

use super::value::Value;

/// Deep equality between two values
///
/// Values with different type tags are never equal, even when they would
/// coerce to each other. Functions compare by source text. Arrays, objects
/// and instances compare by key count and per-key recursive equality, in
/// any key order. Everything else is a strict comparison, so `NaN` is not
/// equal to itself.
pub fn equals(a: &Value, b: &Value) -> bool {
    if a.type_name() != b.type_name() {
        return false;
    }
    match (a, b) {
        (Value::Function(left), Value::Function(right)) => left == right,
        (Value::Array(left), Value::Array(right)) => {
            left.len() == right.len() && left.iter().zip(right).all(|(l, r)| equals(l, r))
        }
        (Value::Object(left), Value::Object(right))
        | (Value::Instance { fields: left, .. }, Value::Instance { fields: right, .. }) => {
            left.len() == right.len()
                && left
                    .iter()
                    .all(|(key, value)| right.get(key).is_some_and(|other| equals(value, other)))
        }
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(left), Value::Bool(right)) => left == right,
        (Value::Number(left), Value::Number(right)) => left == right,
        (Value::String(left), Value::String(right)) => left == right,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        Value::object([
            ("name", Value::from("checkout")),
            ("tags", Value::from(vec!["a", "b"])),
            (
                "nested",
                Value::object([("when", Value::instance("Date", [("time", Value::from(1))]))]),
            ),
            ("callback", Value::function("function () { return 1; }")),
            ("missing", Value::Undefined),
        ])
    }

    #[test]
    fn test_reflexive_for_composites() {
        let value = sample();
        assert!(equals(&value, &value));
        assert!(equals(&value, &value.clone()));
    }

    #[test]
    fn test_type_tags_must_match() {
        assert!(!equals(&Value::from(1), &Value::from("1")));
        assert!(!equals(&Value::Null, &Value::Undefined));
        assert!(!equals(&Value::from(false), &Value::from(0)));
        assert!(!equals(&Value::Array(vec![]), &Value::Object(Default::default())));
        assert!(!equals(
            &Value::object([("time", Value::from(1))]),
            &Value::instance("Date", [("time", Value::from(1))])
        ));
        assert!(!equals(
            &Value::instance("RegExp", [("source", Value::from("a"))]),
            &Value::instance("Date", [("source", Value::from("a"))])
        ));
        assert!(!equals(
            &Value::instance("Date", [("time", Value::from(1))]),
            &Value::instance("date", [("time", Value::from(1))])
        ));
    }

    #[test]
    fn test_functions_compare_by_source_text() {
        let f = Value::function("function (a) { return a; }");
        assert!(equals(&f, &Value::function("function (a) { return a; }")));
        assert!(!equals(&f, &Value::function("function (a) {return a;}")));
    }

    #[test]
    fn test_object_key_order_is_irrelevant() {
        let ab = Value::object([("a", Value::from(1)), ("b", Value::from(2))]);
        let ba = Value::object([("b", Value::from(2)), ("a", Value::from(1))]);
        assert!(equals(&ab, &ba));
    }

    #[test]
    fn test_object_key_count_and_values() {
        let ab = Value::object([("a", Value::from(1)), ("b", Value::from(2))]);
        let a = Value::object([("a", Value::from(1))]);
        let ac = Value::object([("a", Value::from(1)), ("c", Value::from(2))]);
        let ab3 = Value::object([("a", Value::from(1)), ("b", Value::from(3))]);
        assert!(!equals(&ab, &a));
        assert!(!equals(&a, &ab));
        assert!(!equals(&ab, &ac));
        assert!(!equals(&ab, &ab3));
    }

    #[test]
    fn test_arrays_are_ordered() {
        assert!(equals(&Value::from(vec![1, 2]), &Value::from(vec![1, 2])));
        assert!(!equals(&Value::from(vec![1, 2]), &Value::from(vec![2, 1])));
        assert!(!equals(&Value::from(vec![1, 2]), &Value::from(vec![1, 2, 3])));
    }

    #[test]
    fn test_primitives_are_strict() {
        assert!(equals(&Value::from("x"), &Value::from("x")));
        assert!(!equals(&Value::from("x"), &Value::from("y")));
        assert!(equals(&Value::from(1.0), &Value::from(1)));
        assert!(!equals(&Value::from(f64::NAN), &Value::from(f64::NAN)));
    }
}
