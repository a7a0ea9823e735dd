// Structured generation: schema-constrained requests decoded into typed records
use anyhow::{Context, Result};
use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{extract_json_from_text, LlmProvider, LlmRequest, ResponseSchema};

/// A record the model can be asked to produce.
///
/// Implemented for every `JsonSchema + DeserializeOwned` type. The generated schema is
/// normalised for strict json_schema response formats: every object closes
/// `additionalProperties`, lists all of its properties as required, and carries no
/// `$ref` indirection.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    fn response_schema() -> Value {
        let schema = schema_for!(Self);
        let mut value = serde_json::to_value(schema).unwrap_or_default();

        let definitions = match &mut value {
            Value::Object(map) => {
                map.remove("$schema");
                map.remove("definitions")
            }
            _ => None,
        };
        if let Some(defs) = definitions {
            inline_refs(&mut value, &defs);
        }
        close_objects(&mut value);

        value
    }

    fn type_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

/// Ask `provider` for a record of type `T`.
///
/// The schema travels both as a response format and inline in the prompt, so providers
/// without native json_schema support still see it. Output that is not a conforming
/// JSON object is an error.
pub async fn generate_structured<T: StructuredOutput>(
    provider: &dyn LlmProvider,
    mut request: LlmRequest,
) -> Result<T> {
    let name = T::type_name();
    let schema = T::response_schema();

    request.prompt = format!(
        "{}\n\nRespond ONLY with a JSON object matching this schema:\n{}",
        request.prompt,
        serde_json::to_string_pretty(&schema).context("Failed to render response schema")?
    );
    request.response_schema = Some(ResponseSchema {
        name: name.clone(),
        schema,
    });

    let response = provider.generate(request).await?;

    // json_schema replies are bare JSON and may hold fences inside string values
    if let Ok(value) = serde_json::from_str::<T>(response.content.trim()) {
        return Ok(value);
    }

    let cleaned = extract_json_from_text(&response.content)
        .with_context(|| format!("No JSON object found in {} response", name))?;

    serde_json::from_str(&cleaned).with_context(|| {
        format!(
            "{} response does not match its schema. Input was: {}",
            name, cleaned
        )
    })
}

fn close_objects(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("type") == Some(&Value::String("object".to_string())) {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
                if let Some(Value::Object(props)) = map.get("properties") {
                    let keys = props.keys().cloned().map(Value::String).collect();
                    map.insert("required".to_string(), Value::Array(keys));
                }
            }
            for (_, v) in map.iter_mut() {
                close_objects(v);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                close_objects(item);
            }
        }
        _ => {}
    }
}

fn inline_refs(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            // schemars wraps described refs as `allOf: [{ $ref }]`; flatten single-element wrappers
            let single_all_of = matches!(map.get("allOf"), Some(Value::Array(a)) if a.len() == 1);
            if single_all_of {
                if let Some(Value::Array(mut all_of)) = map.remove("allOf") {
                    if let Some(Value::Object(inner)) = all_of.pop() {
                        for (k, v) in inner {
                            map.entry(k).or_insert(v);
                        }
                    }
                }
            }

            let target = map
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| r.strip_prefix("#/definitions/"))
                .and_then(|name| definitions.get(name))
                .cloned();

            if let Some(resolved) = target {
                map.remove("$ref");
                if let Value::Object(resolved_map) = resolved {
                    for (k, v) in resolved_map {
                        map.entry(k).or_insert(v);
                    }
                }
            }

            for (_, v) in map.iter_mut() {
                inline_refs(v, definitions);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                inline_refs(item, definitions);
            }
        }
        _ => {}
    }
}
