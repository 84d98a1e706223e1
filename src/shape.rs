//! Declared output shapes and validation of agent output
//!
//! Every agent declares the exact set of fields it produces. Raw capability
//! output is checked against that declaration before anything reaches the
//! dataset, so downstream code only ever sees declared fields.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the field that carries free-text justification by default
pub const DEFAULT_EXPLANATION_FIELD: &str = "reasoning";

/// Name of the optional self-reported certainty field
pub const CERTAINTY_FIELD: &str = "certainty";

/// Scalar type expected for one output field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// UTF-8 text
    String,
    /// Whole number
    Integer,
    /// Any JSON number
    Number,
    /// true / false
    Boolean,
    /// Array of strings
    StringList,
}

impl FieldType {
    fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::StringList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
        }
    }

    /// JSON schema type name
    pub fn json_type(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::StringList => "array",
        }
    }
}

/// Declaration of a single output field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name, also the last component of the derived column name
    pub name: String,
    /// Expected type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether the field may be absent or null
    #[serde(default)]
    pub optional: bool,
    /// Closed set of allowed values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
    /// Inclusive lower bound for numeric fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive upper bound for numeric fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl FieldSpec {
    /// Create a required field
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            optional: false,
            allowed: None,
            min: None,
            max: None,
        }
    }

    /// Mark the field optional
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Restrict the field to a closed set of values
    pub fn with_allowed(mut self, allowed: Vec<Value>) -> Self {
        self.allowed = Some(allowed);
        self
    }

    /// Restrict a numeric field to an inclusive range
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    fn check(&self, value: &Value) -> Result<()> {
        if !self.field_type.matches(value) {
            return Err(Error::validation(format!(
                "field '{}' expected {}, got {}",
                self.name,
                self.field_type.json_type(),
                value
            )));
        }

        if let Some(allowed) = &self.allowed {
            if !allowed.iter().any(|a| values_equal(a, value)) {
                return Err(Error::validation(format!(
                    "field '{}' value {} is not one of {}",
                    self.name,
                    value,
                    Value::Array(allowed.clone())
                )));
            }
        }

        if let Some(n) = value.as_f64() {
            let below = self.min.is_some_and(|min| n < min);
            let above = self.max.is_some_and(|max| n > max);
            if below || above {
                return Err(Error::validation(format!(
                    "field '{}' value {} is outside [{}, {}]",
                    self.name,
                    n,
                    self.min.map_or("-inf".to_string(), |v| v.to_string()),
                    self.max.map_or("inf".to_string(), |v| v.to_string()),
                )));
            }
        }

        Ok(())
    }
}

// 5 and 5.0 are the same score
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// The full set of fields an agent produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputShape {
    fields: Vec<FieldSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    explanation_field: Option<String>,
}

impl OutputShape {
    /// Create a shape from field declarations.
    ///
    /// The explanation field defaults to `reasoning` when such a string field is declared.
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self> {
        let mut seen = std::collections::HashSet::new();
        for field in &fields {
            if field.name.is_empty() {
                return Err(Error::config("output field names must not be empty"));
            }
            if field.name == crate::workflow::columns::OUTPUT_FIELD {
                return Err(Error::config(format!(
                    "output field name '{}' is reserved",
                    field.name
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(Error::config(format!(
                    "output field '{}' declared twice",
                    field.name
                )));
            }
        }

        let explanation_field = fields
            .iter()
            .find(|f| f.name == DEFAULT_EXPLANATION_FIELD && f.field_type == FieldType::String)
            .map(|f| f.name.clone());

        Ok(Self {
            fields,
            explanation_field,
        })
    }

    /// Use another string field to carry diagnostics of failed evaluations
    pub fn with_explanation_field(mut self, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        match self.field(&name) {
            Some(f) if f.field_type == FieldType::String => {
                self.explanation_field = Some(name);
                Ok(self)
            }
            _ => Err(Error::config(format!(
                "explanation field '{}' must be a declared string field",
                name
            ))),
        }
    }

    /// Add the optional `certainty` field (integer percentage)
    pub fn with_certainty(mut self) -> Self {
        if self.field(CERTAINTY_FIELD).is_none() {
            self.fields.push(
                FieldSpec::new(CERTAINTY_FIELD, FieldType::Integer)
                    .optional()
                    .with_range(0.0, 100.0),
            );
        }
        self
    }

    /// Title/abstract screening: `reasoning` plus `evaluation` on a 1–5 include scale
    pub fn title_abstract() -> Self {
        Self {
            fields: vec![
                FieldSpec::new(DEFAULT_EXPLANATION_FIELD, FieldType::String),
                FieldSpec::new("evaluation", FieldType::Integer).with_range(1.0, 5.0),
            ],
            explanation_field: Some(DEFAULT_EXPLANATION_FIELD.to_string()),
        }
    }

    /// Scoring: `reasoning` plus a `score` restricted to `score_set`
    pub fn scoring(score_set: &[i64]) -> Self {
        let allowed = score_set.iter().map(|s| Value::from(*s)).collect();
        Self {
            fields: vec![
                FieldSpec::new(DEFAULT_EXPLANATION_FIELD, FieldType::String),
                FieldSpec::new("score", FieldType::Integer).with_allowed(allowed),
            ],
            explanation_field: Some(DEFAULT_EXPLANATION_FIELD.to_string()),
        }
    }

    /// Abstraction: one string field per key.
    ///
    /// There is no explanation field, so a sentinel is all nulls in the
    /// dataset; the diagnostic is only kept in [`Evaluation`](crate::agent::Evaluation)
    /// and the workflow's degraded list. Use [`Self::with_explanation_field`]
    /// to route it into one of the keys.
    pub fn abstraction<I, S>(keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields = keys
            .into_iter()
            .map(|k| FieldSpec::new(k, FieldType::String))
            .collect::<Vec<_>>();
        if fields.is_empty() {
            return Err(Error::config("abstraction shape needs at least one key"));
        }
        Self::new(fields)
    }

    /// Declared fields in order
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Look up one field
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field receiving the diagnostic message of a sentinel result
    pub fn explanation_field(&self) -> Option<&str> {
        self.explanation_field.as_deref()
    }

    /// Check raw capability output and keep only declared fields
    pub fn validate(&self, raw: &Value) -> Result<StructuredOutput> {
        let Value::Object(map) = raw else {
            return Err(Error::validation(format!(
                "expected a JSON object, got {}",
                raw
            )));
        };

        let mut fields = Vec::with_capacity(self.fields.len());
        for spec in &self.fields {
            match map.get(&spec.name) {
                None | Some(Value::Null) if spec.optional => {
                    fields.push((spec.name.clone(), Value::Null));
                }
                None | Some(Value::Null) => {
                    return Err(Error::validation(format!(
                        "missing required field '{}'",
                        spec.name
                    )));
                }
                Some(value) => {
                    spec.check(value)?;
                    fields.push((spec.name.clone(), value.clone()));
                }
            }
        }

        let dropped = map.keys().filter(|k| self.field(k).is_none()).count();
        if dropped > 0 {
            tracing::debug!(dropped, "ignoring undeclared output keys");
        }

        Ok(StructuredOutput { fields })
    }

    /// Output written for an evaluation that exhausted its retries
    pub fn sentinel(&self, diagnostic: impl Into<String>) -> StructuredOutput {
        let diagnostic = diagnostic.into();
        let fields = self
            .fields
            .iter()
            .map(|spec| {
                let value = if Some(spec.name.as_str()) == self.explanation_field() {
                    Value::String(diagnostic.clone())
                } else {
                    Value::Null
                };
                (spec.name.clone(), value)
            })
            .collect();
        StructuredOutput { fields }
    }

    /// JSON schema describing the shape, for capabilities that support structured output
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        for spec in &self.fields {
            let mut prop = Map::new();
            prop.insert("type".into(), Value::from(spec.field_type.json_type()));
            if spec.field_type == FieldType::StringList {
                prop.insert("items".into(), serde_json::json!({ "type": "string" }));
            }
            if let Some(allowed) = &spec.allowed {
                prop.insert("enum".into(), Value::Array(allowed.clone()));
            }
            if let Some(min) = spec.min {
                prop.insert("minimum".into(), Value::from(min));
            }
            if let Some(max) = spec.max {
                prop.insert("maximum".into(), Value::from(max));
            }
            properties.insert(spec.name.clone(), Value::Object(prop));
        }

        let required: Vec<Value> = self
            .fields
            .iter()
            .filter(|f| !f.optional)
            .map(|f| Value::from(f.name.clone()))
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Validated output of one evaluation, fields in declared order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredOutput {
    fields: Vec<(String, Value)>,
}

impl StructuredOutput {
    /// Fields in declared order
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    /// Value of one field
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// The whole output as a JSON object
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scoring_accepts_allowed_score() {
        let shape = OutputShape::scoring(&[1, 2, 3, 4, 5]).with_certainty();
        let out = shape
            .validate(&json!({"reasoning": "fits criteria", "score": 4, "extra": true}))
            .unwrap();
        assert_eq!(out.get("score"), Some(&json!(4)));
        assert_eq!(out.get("certainty"), Some(&Value::Null));
        assert!(out.get("extra").is_none());
    }

    #[test]
    fn test_scoring_rejects_out_of_set_score() {
        let shape = OutputShape::scoring(&[1, 2]);
        let err = shape
            .validate(&json!({"reasoning": "x", "score": 7}))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_missing_and_mistyped_fields() {
        let shape = OutputShape::title_abstract();
        assert!(shape.validate(&json!({"reasoning": "x"})).is_err());
        assert!(shape
            .validate(&json!({"reasoning": "x", "evaluation": "5"}))
            .is_err());
        assert!(shape
            .validate(&json!({"reasoning": "x", "evaluation": 6}))
            .is_err());
        assert!(shape.validate(&json!("not an object")).is_err());
    }

    #[test]
    fn test_certainty_range() {
        let shape = OutputShape::title_abstract().with_certainty();
        assert!(shape
            .validate(&json!({"reasoning": "x", "evaluation": 2, "certainty": 101}))
            .is_err());
        assert!(shape
            .validate(&json!({"reasoning": "x", "evaluation": 2, "certainty": 80}))
            .is_ok());
    }

    #[test]
    fn test_sentinel_nulls_everything_but_explanation() {
        let shape = OutputShape::scoring(&[1, 2]);
        let sentinel = shape.sentinel("gave up after 3 attempts");
        assert_eq!(sentinel.get("score"), Some(&Value::Null));
        assert_eq!(
            sentinel.get("reasoning"),
            Some(&json!("gave up after 3 attempts"))
        );
    }

    #[test]
    fn test_abstraction_shape_has_no_explanation_by_default() {
        let shape = OutputShape::abstraction(["population", "intervention"]).unwrap();
        assert!(shape.explanation_field().is_none());
        let sentinel = shape.sentinel("failed");
        assert!(sentinel.fields().iter().all(|(_, v)| v.is_null()));

        let shape = shape.with_explanation_field("population").unwrap();
        assert_eq!(shape.explanation_field(), Some("population"));
    }

    #[test]
    fn test_reserved_and_duplicate_names() {
        assert!(OutputShape::new(vec![FieldSpec::new("output", FieldType::String)]).is_err());
        assert!(OutputShape::new(vec![
            FieldSpec::new("a", FieldType::String),
            FieldSpec::new("a", FieldType::Integer),
        ])
        .is_err());
    }

    #[test]
    fn test_json_schema_lists_required_fields() {
        let schema = OutputShape::scoring(&[1, 2]).with_certainty().json_schema();
        assert_eq!(schema["required"], json!(["reasoning", "score"]));
        assert_eq!(schema["properties"]["score"]["enum"], json!([1, 2]));
    }
}
