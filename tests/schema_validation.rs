//! Schema definition, validation and registry tests.

use std::collections::BTreeMap;
use std::sync::Arc;
use stratus::{
    DocumentStore, FieldType, MemoryAdapter, Schema, SchemaRegistry, Session, StoreError,
    Timestamp, Value, ValueMap, ViolationKind,
};

fn registry() -> SchemaRegistry {
    let adapter = Arc::new(MemoryAdapter::new());
    let session = Arc::new(Session::new());
    SchemaRegistry::new(Arc::new(DocumentStore::new(adapter, session)))
}

fn schema_with(field: &str, tag: FieldType) -> Schema {
    let mut fields = BTreeMap::new();
    fields.insert(field.to_string(), tag);
    Schema::new("Model", fields)
}

fn values(pairs: &[(&str, Value)]) -> ValueMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// The six runtime kinds, one sample each.
fn samples() -> Vec<Value> {
    vec![
        Value::text("test"),
        Value::Number(1.0),
        Value::Bool(true),
        Value::List(vec![Value::Number(1.0), Value::Number(2.0)]),
        Value::Map(BTreeMap::from([("a".to_string(), Value::Number(1.0))])),
        Value::Timestamp(Timestamp(1_577_836_800_000_000)),
    ]
}

// --- Field validation (exhaustive tag x wrong-kind grid) ---

#[test]
fn test_every_tag_rejects_every_wrong_kind() {
    let tags = [
        FieldType::Text,
        FieldType::Number,
        FieldType::Boolean,
        FieldType::List,
        FieldType::Map,
        FieldType::Timestamp,
    ];
    for tag in tags {
        let schema = schema_with("field", tag);
        for value in samples() {
            let result = schema.validate(&values(&[("field", value.clone())]));
            if tag.validates(&value) {
                assert!(
                    result.is_ok(),
                    "{tag:?} should accept {:?}",
                    value.kind()
                );
            } else {
                assert!(
                    matches!(result, Err(StoreError::Validation(_))),
                    "{tag:?} should reject {:?}",
                    value.kind()
                );
            }
        }
    }
}

#[test]
fn test_mixed_schema_accepts_well_typed_record() {
    let mut fields = BTreeMap::new();
    fields.insert("string".to_string(), FieldType::Text);
    fields.insert("number".to_string(), FieldType::Number);
    fields.insert("boolean".to_string(), FieldType::Boolean);
    fields.insert("array".to_string(), FieldType::List);
    fields.insert("object".to_string(), FieldType::Map);
    fields.insert("date".to_string(), FieldType::Timestamp);
    let schema = Schema::new("Model", fields);

    let mut pairs = values(&[
        ("string", Value::text("test")),
        ("number", Value::Number(1.0)),
        ("boolean", Value::Bool(true)),
        ("array", Value::List(vec![Value::Number(1.0)])),
        ("date", Value::Timestamp(Timestamp(1_577_836_800_000_000))),
    ]);
    pairs.insert(
        "object".to_string(),
        Value::Map(BTreeMap::from([
            ("a".to_string(), Value::Number(1.0)),
            ("b".to_string(), Value::text("b")),
            ("c".to_string(), Value::Bool(true)),
        ])),
    );

    schema.validate(&pairs).unwrap();
}

#[test]
fn test_validation_error_lists_every_offender() {
    let mut fields = BTreeMap::new();
    fields.insert("a".to_string(), FieldType::Text);
    fields.insert("b".to_string(), FieldType::Number);
    let schema = Schema::new("Model", fields);

    let err = schema
        .validate(&values(&[
            ("a", Value::Number(1.0)),
            ("b", Value::text("1")),
            ("c", Value::Bool(true)),
        ]))
        .unwrap_err();

    let StoreError::Validation(e) = err else {
        panic!("expected validation error");
    };
    assert_eq!(e.violations.len(), 3);

    let undeclared: Vec<&str> = e
        .violations
        .iter()
        .filter(|v| v.kind == ViolationKind::UndeclaredField)
        .map(|v| v.field.as_str())
        .collect();
    assert_eq!(undeclared, vec!["c"]);

    // The message names every field.
    let message = e.to_string();
    for field in ["a", "b", "c"] {
        assert!(message.contains(field), "missing `{field}` in: {message}");
    }
}

// --- Unknown fields at construction ---

#[test]
fn test_unknown_property_fails_construction() {
    let registry = registry();
    let factory = registry
        .register(schema_with("string", FieldType::Text))
        .unwrap();

    let err = factory
        .create(values(&[
            ("string", Value::text("string")),
            ("nope", Value::text("not a chance")),
        ]))
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::UnknownField { model, field } if model == "Model" && field == "nope"
    ));
}

#[test]
fn test_unknown_property_fails_even_with_valid_siblings() {
    let registry = registry();
    let factory = registry
        .register(schema_with("string", FieldType::Text))
        .unwrap();

    // All declared keys valid; the one stray key still fails construction.
    let err = factory
        .create(values(&[
            ("id", Value::text("m1")),
            ("string", Value::text("fine")),
            ("stray", Value::Number(0.0)),
        ]))
        .unwrap_err();
    assert!(matches!(err, StoreError::UnknownField { .. }));
}

// --- Registry ---

#[test]
fn test_duplicate_schema_registration() {
    let registry = registry();
    let first = registry
        .register(schema_with("string", FieldType::Text))
        .unwrap();

    let err = registry
        .register(schema_with("other", FieldType::Number))
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateSchema(name) if name == "Model"));

    // The first factory is unaffected: it still constructs instances with
    // its original shape.
    first
        .create(values(&[("string", Value::text("still fine"))]))
        .unwrap();
    let looked_up = registry.lookup("Model").unwrap();
    assert!(looked_up.schema().fields().contains_key("string"));
}

#[test]
fn test_lookup_unknown_schema() {
    let registry = registry();
    assert!(matches!(
        registry.lookup("Missing"),
        Err(StoreError::UnknownSchema(name)) if name == "Missing"
    ));
}
