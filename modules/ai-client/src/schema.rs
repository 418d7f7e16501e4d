use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Types a completion provider can be forced to return.
///
/// Implemented for every `JsonSchema + DeserializeOwned` type. The generated
/// schema is self-contained: `$ref`s are inlined, `definitions` and `$schema`
/// are dropped, and every property is listed in `required`.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    fn tool_schema() -> Value {
        let schema = schema_for!(Self);
        let mut value = serde_json::to_value(schema).unwrap_or_default();

        let definitions = value.get("definitions").cloned();
        if let Some(defs) = definitions {
            inline_refs(&mut value, &defs);
        }
        require_all(&mut value);

        if let Value::Object(map) = &mut value {
            map.remove("definitions");
            map.remove("$schema");
        }

        value
    }

    fn type_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

fn require_all(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("type") == Some(&Value::String("object".into())) {
                if let Some(Value::Object(props)) = map.get("properties") {
                    let keys = props.keys().cloned().map(Value::String).collect();
                    map.insert("required".into(), Value::Array(keys));
                }
            }
            map.values_mut().for_each(require_all);
        }
        Value::Array(items) => items.iter_mut().for_each(require_all),
        _ => {}
    }
}

fn inline_refs(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            let target = map
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| r.strip_prefix("#/definitions/"))
                .and_then(|name| definitions.get(name))
                .cloned();
            if let Some(def) = target {
                // Keep a sibling description, schemars puts the field doc next to the $ref.
                let description = map.get("description").cloned();
                *value = def;
                if let (Some(desc), Value::Object(inlined)) = (description, &mut *value) {
                    inlined.insert("description".into(), desc);
                }
                inline_refs(value, definitions);
                return;
            }

            if let Some(Value::Array(all_of)) = map.get("allOf") {
                if let [only] = all_of.as_slice() {
                    let only = only.clone();
                    let description = map.get("description").cloned();
                    *value = only;
                    if let (Some(desc), Value::Object(inlined)) = (description, &mut *value) {
                        inlined.entry("description").or_insert(desc);
                    }
                    inline_refs(value, definitions);
                    return;
                }
            }

            map.values_mut().for_each(|v| inline_refs(v, definitions));
        }
        Value::Array(items) => items.iter_mut().for_each(|v| inline_refs(v, definitions)),
        _ => {}
    }
}
