//! Parameter schemas, validation and coercion.

use indexmap::IndexMap;
use panos_mcp_types::PropertySchema;
use serde_json::Value;

use crate::error::ToolError;

/// Placeholder written to logs in place of sensitive values.
pub const REDACTED: &str = "[REDACTED]";

/// One declared tool parameter. Values reach handlers as strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub required: bool,
    pub default: Option<String>,
    pub description: String,
    pub sensitive: bool,
}

impl ParamSpec {
    pub fn string(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            default: None,
            description: String::new(),
            sensitive: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn to_property(&self) -> PropertySchema {
        let mut property = PropertySchema::string();
        if !self.description.is_empty() {
            property = property.description(&self.description);
        }
        if let Some(default) = &self.default {
            property = property.default_value(Value::String(default.clone()));
        }
        property
    }
}

/// Validated string parameters, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: IndexMap<String, String>,
}

impl Params {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Value of a declared parameter. Required and defaulted parameters are
    /// always present after validation.
    pub fn require(&self, name: &str) -> Result<&str, ToolError> {
        self.get(name)
            .ok_or_else(|| ToolError::MissingParameter(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy for logging with sensitive values masked.
    pub fn redacted(&self, specs: &[ParamSpec]) -> Vec<(String, String)> {
        self.values
            .iter()
            .map(|(name, value)| {
                let sensitive = specs.iter().any(|s| s.sensitive && &s.name == name);
                let shown = if sensitive { REDACTED } else { value.as_str() };
                (name.clone(), shown.to_string())
            })
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Check `arguments` against `specs`, apply defaults and coerce values.
///
/// `None` and `null` arguments count as an empty object.
pub fn validate(specs: &[ParamSpec], arguments: Option<&Value>) -> Result<Params, ToolError> {
    let empty = serde_json::Map::new();
    let args = match arguments {
        None | Some(Value::Null) => &empty,
        Some(Value::Object(map)) => map,
        Some(_) => return Err(ToolError::NotAnObject),
    };

    for name in args.keys() {
        if !specs.iter().any(|s| &s.name == name) {
            tracing::debug!(parameter = %name, "ignoring undeclared parameter");
        }
    }

    let mut values = IndexMap::new();
    for spec in specs {
        let supplied = match args.get(&spec.name) {
            Some(value) => coerce(&spec.name, value)?,
            None => None,
        };
        let supplied = supplied.filter(|v| !v.is_empty());
        match (supplied, &spec.default) {
            (Some(value), _) => {
                values.insert(spec.name.clone(), value);
            }
            (None, _) if spec.required => {
                return Err(ToolError::MissingParameter(spec.name.clone()));
            }
            (None, Some(default)) => {
                values.insert(spec.name.clone(), default.clone());
            }
            (None, None) => {}
        }
    }
    Ok(Params { values })
}

fn coerce(name: &str, value: &Value) -> Result<Option<String>, ToolError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.trim().to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(_) => Err(ToolError::invalid(name, "expected a string, got an array")),
        Value::Object(_) => Err(ToolError::invalid(name, "expected a string, got an object")),
    }
}
