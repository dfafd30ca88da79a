// src/aggregation.rs
// Degraded-mode aggregation shim: a single $group stage over a full
// collection scan. Anything else degrades to an empty result.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::document::Document;
use crate::error::Result;
use crate::filter::Filter;
use crate::store::CollectionStore;

/// Bucket name for documents whose group key is missing, null or empty.
const UNKNOWN_KEY: &str = "Unknown";

/// Parsed `$group` stage: one key field, `$sum` accumulators only.
#[derive(Debug, Clone)]
struct GroupStage {
    key_field: String,
    accumulators: Vec<(String, SumExpression)>,
}

#[derive(Debug, Clone)]
enum SumExpression {
    Constant(i64), // {"$sum": 1} - member count
    Field(String), // {"$sum": "$amount"} - sum field values
}

impl GroupStage {
    /// Recognize the one supported pipeline shape: a single stage that is
    /// a `$group` keyed by `"$field"`, with `$sum` accumulators. Returns
    /// `None` for every other shape.
    fn from_pipeline(pipeline: &Value) -> Option<Self> {
        let stages = pipeline.as_array()?;
        let [stage] = stages.as_slice() else {
            return None;
        };

        let spec = stage.as_object()?;
        if spec.len() != 1 {
            return None;
        }
        let group = spec.get("$group")?.as_object()?;

        let key_field = group.get("_id")?.as_str()?.strip_prefix('$')?.to_string();

        let mut accumulators = Vec::new();
        for (name, acc) in group {
            if name == "_id" {
                continue;
            }
            let acc = acc.as_object()?;
            if acc.len() != 1 {
                return None;
            }
            let sum = acc.get("$sum")?;

            let expression = if let Some(n) = sum.as_i64() {
                SumExpression::Constant(n)
            } else if let Some(field) = sum.as_str().and_then(|s| s.strip_prefix('$')) {
                SumExpression::Field(field.to_string())
            } else {
                return None;
            };

            accumulators.push((name.clone(), expression));
        }

        Some(GroupStage {
            key_field,
            accumulators,
        })
    }

    fn execute(&self, docs: &[Document]) -> Vec<Value> {
        // first-seen key order, deterministic output
        let mut order: Vec<Value> = Vec::new();
        let mut groups: HashMap<String, Vec<f64>> = HashMap::new();

        for doc in docs {
            // null and empty-string keys merge into the Unknown bucket,
            // same as a missing field
            let key = match doc.get(&self.key_field) {
                None | Some(Value::Null) => Value::String(UNKNOWN_KEY.to_string()),
                Some(Value::String(s)) if s.is_empty() => {
                    Value::String(UNKNOWN_KEY.to_string())
                }
                Some(value) => value.clone(),
            };
            let key_tag = key.to_string();

            let sums = groups.entry(key_tag).or_insert_with(|| {
                order.push(key);
                vec![0.0; self.accumulators.len()]
            });

            for (i, (_, expression)) in self.accumulators.iter().enumerate() {
                match expression {
                    SumExpression::Constant(n) => sums[i] += *n as f64,
                    SumExpression::Field(field) => {
                        sums[i] += doc.get(field).map_or(0.0, numeric_value);
                    }
                }
            }
        }

        order
            .into_iter()
            .map(|key| {
                let sums = &groups[&key.to_string()];
                let mut result = Map::new();
                result.insert("_id".to_string(), key);
                for ((name, _), sum) in self.accumulators.iter().zip(sums) {
                    result.insert(name.clone(), number_value(*sum));
                }
                Value::Object(result)
            })
            .collect()
    }
}

/// Numeric coercion for sums: numbers as-is, numeric strings parsed
/// (the persisted data carries counts as strings in places), everything
/// else contributes zero.
fn numeric_value(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn number_value(sum: f64) -> Value {
    if sum.fract() == 0.0 && sum.abs() < i64::MAX as f64 {
        Value::from(sum as i64)
    } else {
        serde_json::Number::from_f64(sum).map_or(Value::Null, Value::Number)
    }
}

/// Group the collection per the pipeline. Unsupported pipeline shapes
/// yield an empty result with a logged diagnostic, never an error.
pub fn aggregate(store: &CollectionStore, collection: &str, pipeline: &Value) -> Result<Vec<Value>> {
    let Some(stage) = GroupStage::from_pipeline(pipeline) else {
        log::warn!("unsupported aggregation pipeline for '{collection}': {pipeline}");
        return Ok(Vec::new());
    };

    let docs = store.find(collection, &Filter::new())?;
    Ok(stage.execute(&docs))
}
