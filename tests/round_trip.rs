/// End-to-end: JSON schema → compress → (model answers with short keys) → expand.
use indexmap::IndexMap;
use serde_json::{json, Value};

use schema_squash::{
    compress, compress_document, expand, expand_json, ExpandError, ExpandOptions, FieldMap, Key, SchemaDocument,
    SchemaNode,
};

fn document(schema: Value) -> SchemaDocument {
    SchemaDocument::from_json(&schema).expect("fixture schema")
}

#[test]
fn test_scenario_flat_person() {
    let compressed = compress_document(&document(json!({
        "type": "object",
        "properties": {
            "first_name": {"type": "string"},
            "last_name": {"type": "string"},
            "age": {"type": "integer"}
        },
        "required": ["first_name", "last_name", "age"]
    })));

    let schema = compressed.to_json_schema();
    assert_eq!(schema["required"], json!(["f", "l", "a"]));
    assert_eq!(schema["properties"]["f"]["description"], json!("first_name"));

    let out = expand_json(&json!({"f": "John", "l": "Doe", "a": 30}), &compressed.field_map).unwrap();
    assert_eq!(out, json!({"first_name": "John", "last_name": "Doe", "age": 30}));
}

#[test]
fn test_scenario_shared_initials() {
    let compressed = compress_document(&document(json!({
        "properties": {
            "summary": {"type": "string", "description": "short abstract"},
            "samples": {"type": "array", "items": {"type": "string"}},
            "source": {"type": "string"}
        }
    })));
    assert_eq!(compressed.properties.keys().collect::<Vec<_>>(), ["s", "sa", "so"]);
    assert_eq!(compressed.properties["s"].description(), Some("summary: short abstract"));

    let out = expand_json(&json!({"s": "x", "sa": ["a", "b"], "so": "web"}), &compressed.field_map).unwrap();
    assert_eq!(out, json!({"summary": "x", "samples": ["a", "b"], "source": "web"}));
}

#[test]
fn test_scenario_nested_collision() {
    let compressed = compress_document(&document(json!({
        "properties": {
            "age": {"type": "integer"},
            "address": {"type": "string"},
            "company": {"type": "object", "properties": {
                "city": {"type": "string"},
                "headquarters": {"type": "object", "properties": {"city": {"type": "string"}}}
            }}
        }
    })));
    assert_eq!(compressed.field_map.to_json(), json!({
        "a": "age",
        "ad": "address",
        "c": {"_original": "company", "ci": "city", "h": {"_original": "headquarters", "ct": "city"}}
    }));

    let out = expand_json(
        &json!({"a": 41, "ad": "Main St", "c": {"ci": "Oslo", "h": {"ct": "Bergen"}}}),
        &compressed.field_map,
    ).unwrap();
    assert_eq!(out, json!({
        "age": 41,
        "address": "Main St",
        "company": {"city": "Oslo", "headquarters": {"city": "Bergen"}}
    }));
}

#[test]
fn test_scenario_nullable_array_union() {
    let compressed = compress_document(&document(json!({
        "properties": {
            "matches": {"anyOf": [
                {"type": "array", "items": {"type": "object", "properties": {
                    "title": {"type": "string"},
                    "confidence": {"type": "number"}
                }, "required": ["title"]}},
                {"type": "null"}
            ], "description": "candidate matches"}
        }
    })));
    assert_eq!(compressed.field_map.to_json(), json!({
        "m": {"_original": "matches", "_variants": [{"_items": {"t": "title", "c": "confidence"}}, {}]}
    }));
    assert_eq!(compressed.properties["m"].description(), Some("matches: candidate matches"));

    let fm = &compressed.field_map;
    assert_eq!(expand_json(&json!({"m": null}), fm).unwrap(), json!({"matches": null}));
    assert_eq!(expand_json(&json!({}), fm).unwrap(), json!({}));
    assert_eq!(
        expand_json(&json!({"m": [{"t": "A", "c": 0.5}, {"t": "B"}]}), fm).unwrap(),
        json!({"matches": [{"title": "A", "confidence": 0.5}, {"title": "B"}]})
    );
}

#[test]
fn test_scenario_shared_definition() {
    let compressed = compress_document(&document(json!({
        "properties": {
            "founder": {"$ref": "#/$defs/person"},
            "employees": {"type": "array", "items": {"$ref": "#/$defs/person"}}
        },
        "$defs": {
            "person": {"type": "object", "properties": {
                "name": {"type": "string"},
                "age": {"type": "integer"}
            }}
        }
    })));
    let wire = compressed.field_map.to_json();
    assert_eq!(wire["_defs"], json!({"person": {"n": "name", "a": "age"}}));

    // the map survives being written out and read back
    let fm = FieldMap::from_json(&serde_json::from_str(&wire.to_string()).unwrap()).unwrap();
    let out = expand_json(&json!({
        "f": {"n": "Grace", "a": 85},
        "e": [{"n": "Alan", "a": 41}, {"n": "Ada", "a": 36}]
    }), &fm).unwrap();
    assert_eq!(out, json!({
        "founder": {"name": "Grace", "age": 85},
        "employees": [{"name": "Alan", "age": 41}, {"name": "Ada", "age": 36}]
    }));
}

#[test]
fn test_deep_mixed_schema_round_trip() {
    let compressed = compress_document(&document(json!({
        "type": "object",
        "properties": {
            "invoice_id": {"type": "string"},
            "customer": {"$ref": "#/$defs/party"},
            "line_items": {"type": "array", "items": {"type": "object", "properties": {
                "item": {"type": "string"},
                "quantity": {"type": "integer"},
                "discount": {"oneOf": [
                    {"type": "object", "properties": {"percent": {"type": "number"}}},
                    {"type": "object", "properties": {"amount": {"type": "number"}, "currency": {"type": "string"}}},
                    {"type": "null"}
                ]}
            }}},
            "notes": {"type": "array"},
            "approver": {"anyOf": [{"$ref": "#/$defs/party"}, {"type": "null"}]}
        },
        "$defs": {
            "party": {"type": "object", "properties": {
                "name": {"type": "string"},
                "address": {"type": "object", "properties": {
                    "street": {"type": "string"}, "city": {"type": "string"}
                }}
            }}
        }
    })));

    // model response written against the compressed schema
    let fm = &compressed.field_map;
    let wire = fm.to_json();
    let code_of = |name: &str| -> String {
        wire.as_object().unwrap().iter()
            .find(|(_, e)| e.as_str() == Some(name) || e["_original"] == json!(name))
            .map(|(k, _)| k.clone())
            .unwrap()
    };
    let (inv, cust, lines, notes, appr) =
        (code_of("invoice_id"), code_of("customer"), code_of("line_items"), code_of("notes"), code_of("approver"));
    let line = &wire[&lines]["_items"];
    let line_code = |name: &str| -> String {
        line.as_object().unwrap().iter()
            .find(|(_, e)| e.as_str() == Some(name) || e["_original"] == json!(name))
            .map(|(k, _)| k.clone())
            .unwrap()
    };
    let (item, qty, disc) = (line_code("item"), line_code("quantity"), line_code("discount"));
    let arms = &line[&disc]["_variants"];
    let pct = arms[0].as_object().unwrap().keys().next().unwrap().clone();
    let amt = arms[1].as_object().unwrap().keys().next().unwrap().clone();
    let cur = arms[1].as_object().unwrap().keys().nth(1).unwrap().clone();

    let mut response = serde_json::Map::new();
    response.insert(inv, json!("INV-7"));
    response.insert(cust, json!({"n": "Acme", "a": {"s": "1 Loop", "c": "Cupertino"}}));
    response.insert(lines, json!([
        {item.clone(): "bolt", qty.clone(): 10, disc.clone(): {pct: 5}},
        {item.clone(): "nut", qty.clone(): 3, disc.clone(): {amt: 1.5, cur: "EUR"}},
        {item: "washer", qty: 1, disc: null}
    ]));
    response.insert(notes, json!(["rush"]));
    response.insert(appr, json!(null));

    let out = expand_json(&Value::Object(response), fm).unwrap();
    assert_eq!(out, json!({
        "invoice_id": "INV-7",
        "customer": {"name": "Acme", "address": {"street": "1 Loop", "city": "Cupertino"}},
        "line_items": [
            {"item": "bolt", "quantity": 10, "discount": {"percent": 5}},
            {"item": "nut", "quantity": 3, "discount": {"amount": 1.5, "currency": "EUR"}},
            {"item": "washer", "quantity": 1, "discount": null}
        ],
        "notes": ["rush"],
        "approver": null
    }));
}

#[test]
fn test_definition_and_array_arms_round_trip() {
    let mut properties = IndexMap::new();
    properties.insert(
        "approver".to_string(),
        SchemaNode::any_of(vec![SchemaNode::reference("#/$defs/party"), SchemaNode::primitive("null")])
            .describe("who signed off"),
    );
    properties.insert(
        "results".to_string(),
        SchemaNode::any_of(vec![
            SchemaNode::array(Some(SchemaNode::object([("title", SchemaNode::primitive("string"))], &["title"]))),
            SchemaNode::array(Some(SchemaNode::object([("error", SchemaNode::primitive("string"))], &["error"]))),
            SchemaNode::primitive("null"),
        ]),
    );
    let mut pool = IndexMap::new();
    pool.insert("party".to_string(), SchemaNode::object([("name", SchemaNode::primitive("string"))], &["name"]));

    let compressed = compress(&properties, &["approver".to_string()], Some(&pool));
    assert_eq!(compressed.required, ["a"]);
    assert_eq!(compressed.properties["a"].description(), Some("approver: who signed off"));
    assert_eq!(compressed.field_map.to_json(), json!({
        "a": {"_original": "approver", "_variants": [{"_ref": "party"}, {}]},
        "r": {"_original": "results", "_variants": [{"_items": {"t": "title"}}, {"_items": {"e": "error"}}, {}]},
        "_defs": {"party": {"n": "name"}}
    }));

    let fm = &compressed.field_map;
    assert_eq!(expand_json(&json!({"a": {"n": "Ann"}}), fm).unwrap(), json!({"approver": {"name": "Ann"}}));
    assert_eq!(expand_json(&json!({"a": null}), fm).unwrap(), json!({"approver": null}));
    assert_eq!(
        expand_json(&json!({"r": [{"e": "boom"}]}), fm).unwrap(),
        json!({"results": [{"error": "boom"}]})
    );
    assert_eq!(
        expand_json(&json!({"r": [{"t": "found"}, {"t": "also"}]}), fm).unwrap(),
        json!({"results": [{"title": "found"}, {"title": "also"}]})
    );
}

#[test]
fn test_symbolize_reaches_nested_levels() {
    let compressed = compress_document(&document(json!({
        "properties": {
            "order": {"type": "object", "properties": {
                "lines": {"type": "array", "items": {"type": "object", "properties": {"sku": {"type": "string"}}}}
            }}
        }
    })));
    let payload = json!({"o": {"l": [{"s": "A-1"}]}});

    let sym = expand(&payload, &compressed.field_map, ExpandOptions { symbolize: true }).unwrap();
    let line = &sym.get("order").unwrap().get("lines").unwrap().as_array().unwrap()[0];
    assert_eq!(line.keys(), [&Key::Symbol("sku".into())]);

    let text = expand(&payload, &compressed.field_map, ExpandOptions { symbolize: false }).unwrap();
    let line = &text.get("order").unwrap().get("lines").unwrap().as_array().unwrap()[0];
    assert_eq!(line.keys(), [&Key::Text("sku".into())]);
}

#[test]
fn test_inconsistent_field_map_fails_loudly() {
    let fm = FieldMap::from_json(&json!({"b": {"_original": "boss", "_ref": "person"}})).unwrap();
    let err = expand_json(&json!({"b": {"n": "x"}}), &fm).unwrap_err();
    assert_eq!(err, ExpandError::UnresolvedReference { name: "person".into() });
}
