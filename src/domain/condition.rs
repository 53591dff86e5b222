//! Segment condition: the fixed vocabulary of user filter predicates.
//!
//! Every present key is ANDed; an absent key imposes no constraint.

use super::{Decimal, TimeMs};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

/// Structured set of named filter predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Condition {
    /// Registration at or after this instant.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_time_opt"
    )]
    pub created_after: Option<TimeMs>,
    /// Registration at or before this instant.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_time_opt"
    )]
    pub created_before: Option<TimeMs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_orders: Option<bool>,
    /// At least one order with amount >= this value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_order_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_count_min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_designs: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub design_count_min: Option<i64>,
}

impl Condition {
    /// True when no predicate is present (matches every user).
    pub fn is_empty(&self) -> bool {
        *self == Condition::default()
    }

    /// Leniently read a condition from arbitrary JSON.
    ///
    /// A non-object yields the empty condition. Unknown keys, `null` values and
    /// recognized keys carrying an ill-typed value are skipped.
    pub fn from_value(value: &Value) -> Self {
        match value.as_object() {
            Some(map) => Self::from_map(map),
            None => {
                if !value.is_null() {
                    debug!(kind = json_kind(value), "condition is not an object, matching all users");
                }
                Condition::default()
            }
        }
    }

    fn from_map(map: &Map<String, Value>) -> Self {
        let mut condition = Condition::default();

        for (key, value) in map {
            if value.is_null() {
                continue;
            }

            let accepted = match key.as_str() {
                "created_after" => set(&mut condition.created_after, TimeMs::from_json(value)),
                "created_before" => set(&mut condition.created_before, TimeMs::from_json(value)),
                "has_orders" => set(&mut condition.has_orders, value.as_bool()),
                "min_order_amount" => set(&mut condition.min_order_amount, json_decimal(value)),
                "order_count_min" => set(&mut condition.order_count_min, json_integer(value)),
                "has_designs" => set(&mut condition.has_designs, value.as_bool()),
                "design_count_min" => set(&mut condition.design_count_min, json_integer(value)),
                _ => {
                    debug!(key = %key, "ignoring unknown condition key");
                    continue;
                }
            };

            if !accepted {
                debug!(key = %key, kind = json_kind(value), "ignoring ill-typed condition value");
            }
        }

        condition
    }

    /// Serialize to a JSON object containing only the present keys.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Condition::from_value(&value))
    }
}

fn set<T>(slot: &mut Option<T>, parsed: Option<T>) -> bool {
    match parsed {
        Some(v) => {
            *slot = Some(v);
            true
        }
        None => false,
    }
}

fn serialize_time_opt<S>(value: &Option<TimeMs>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(t) => serializer.serialize_str(&t.to_rfc3339()),
        None => serializer.serialize_none(),
    }
}

fn json_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str_lenient(&n.to_string()).ok(),
        Value::String(s) => Decimal::from_str_lenient(s.trim()).ok(),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
