//! Object models.
//!
//! Request bodies are built from keyword arguments against static attribute
//! tables, one per `(service, model)`. Responses go the other way through
//! [`as_dict`], which flattens `properties` and turns the wire's camelCase
//! into the snake_case keys callers compare against.

mod authorization;
mod compute;
mod monitor;
mod network;
mod resource;

use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

use super::error::ModelError;
use super::Service;

/// Shape an attribute takes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    Str,
    Int,
    Bool,
    Float,
    StrList,
    /// Copied verbatim, keys untouched
    Map,
    /// Free-form, keys camelCased recursively
    Object,
    Model(&'static str),
    ModelList(&'static str),
}

impl AttrType {
    fn describe(&self) -> String {
        match self {
            AttrType::Str => "a string".to_string(),
            AttrType::Int => "an integer".to_string(),
            AttrType::Bool => "a boolean".to_string(),
            AttrType::Float => "a number".to_string(),
            AttrType::StrList => "a list of strings".to_string(),
            AttrType::Map | AttrType::Object => "a mapping".to_string(),
            AttrType::Model(m) => format!("a {} mapping", m),
            AttrType::ModelList(m) => format!("a list of {} mappings", m),
        }
    }
}

/// One attribute of a model.
#[derive(Debug, Clone)]
pub struct Attr {
    pub name: &'static str,
    wire: Option<&'static str>,
    /// Lives under `properties` on the wire
    pub in_properties: bool,
    pub ty: AttrType,
    pub required: bool,
}

impl Attr {
    pub fn wire_name(&self) -> String {
        match self.wire {
            Some(wire) => wire.to_string(),
            None => snake_to_camel(self.name),
        }
    }

    fn wire(mut self, wire: &'static str) -> Self {
        self.wire = Some(wire);
        self
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

fn top(name: &'static str, ty: AttrType) -> Attr {
    Attr {
        name,
        wire: None,
        in_properties: false,
        ty,
        required: false,
    }
}

fn prop(name: &'static str, ty: AttrType) -> Attr {
    Attr {
        in_properties: true,
        ..top(name, ty)
    }
}

/// Attribute table rows contributed by each service file.
type ModelTable = Vec<(Service, &'static str, Vec<Attr>)>;

static MODELS: Lazy<HashMap<(Service, &'static str), Vec<Attr>>> = Lazy::new(|| {
    let tables: [ModelTable; 5] = [
        network::models(),
        compute::models(),
        resource::models(),
        monitor::models(),
        authorization::models(),
    ];
    tables
        .into_iter()
        .flatten()
        .map(|(service, model, attrs)| ((service, model), attrs))
        .collect()
});

/// Keys whose values are never case-converted.
const VERBATIM_KEYS: &[&str] = &[
    "tags",
    "metadata",
    "parameters",
    "template",
    "outputs",
    "policy_rule",
];

static VERBATIM: Lazy<HashSet<String>> = Lazy::new(|| {
    let mut keys: HashSet<String> = VERBATIM_KEYS.iter().map(|k| k.to_string()).collect();
    for attrs in MODELS.values() {
        for attr in attrs.iter().filter(|a| a.ty == AttrType::Map) {
            keys.insert(attr.name.to_string());
        }
    }
    keys
});

/// Look up the attribute table of a model.
pub fn model_attrs(service: Service, model: &str) -> Option<&'static [Attr]> {
    MODELS
        .iter()
        .find(|((s, m), _)| *s == service && *m == model)
        .map(|(_, attrs)| attrs.as_slice())
}

/// Build the request body of `model` from keyword arguments.
///
/// Unknown keys and null values are skipped. Nested mappings build nested
/// models.
pub fn build_object_model(
    service: Service,
    model: &str,
    kwargs: &HashMap<String, Value>,
) -> Result<Value, ModelError> {
    let map: Map<String, Value> = kwargs.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    build_from_map(service, model, &map)
}

fn build_from_map(
    service: Service,
    model: &str,
    kwargs: &Map<String, Value>,
) -> Result<Value, ModelError> {
    let attrs = model_attrs(service, model)
        .ok_or_else(|| ModelError::Build(format!("unknown {} model '{}'", service, model)))?;

    let mut body = Map::new();
    let mut properties = Map::new();

    for attr in attrs {
        let value = match kwargs.get(attr.name) {
            Some(Value::Null) | None => {
                if attr.required {
                    return Err(ModelError::Build(format!(
                        "{}() missing required argument: '{}'",
                        model, attr.name
                    )));
                }
                continue;
            }
            Some(value) => convert(service, model, attr, value)?,
        };

        let target = if attr.in_properties {
            &mut properties
        } else {
            &mut body
        };
        target.insert(attr.wire_name(), value);
    }

    if !properties.is_empty() {
        body.insert("properties".to_string(), Value::Object(properties));
    }
    Ok(Value::Object(body))
}

fn mismatch(model: &str, attr: &Attr, value: &Value) -> ModelError {
    let got = match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    };
    ModelError::Parse(format!(
        "{}.{} must be {}, not {}",
        model,
        attr.name,
        attr.ty.describe(),
        got
    ))
}

fn convert(service: Service, model: &str, attr: &Attr, value: &Value) -> Result<Value, ModelError> {
    let fail = || mismatch(model, attr, value);

    match attr.ty {
        AttrType::Str => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            _ => Err(fail()),
        },
        AttrType::Int => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| fail()),
            _ => Err(fail()),
        },
        AttrType::Float => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(fail),
            _ => Err(fail()),
        },
        AttrType::Bool => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "yes" => Ok(Value::Bool(true)),
                "false" | "no" => Ok(Value::Bool(false)),
                _ => Err(fail()),
            },
            _ => Err(fail()),
        },
        AttrType::StrList => match value {
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(_) => Ok(item.clone()),
                    Value::Number(n) => Ok(Value::String(n.to_string())),
                    _ => Err(fail()),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            _ => Err(fail()),
        },
        AttrType::Map => match value {
            Value::Object(_) => Ok(value.clone()),
            _ => Err(fail()),
        },
        AttrType::Object => match value {
            Value::Object(_) | Value::Array(_) => Ok(camelize(value)),
            _ => Err(fail()),
        },
        AttrType::Model(name) => match value {
            Value::Object(map) => build_from_map(service, name, map),
            _ => Err(fail()),
        },
        AttrType::ModelList(name) => match value {
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Object(map) => build_from_map(service, name, map),
                    _ => Err(fail()),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            _ => Err(fail()),
        },
    }
}

/// `address_prefix` -> `addressPrefix`
pub fn snake_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = !out.is_empty();
            continue;
        }
        if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// `publicIPAddress` -> `public_ip_address`
///
/// An underscore goes before an uppercase letter that follows a lowercase
/// letter or digit, or that starts a new word after an acronym.
pub fn camel_to_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).map(|n| n.is_lowercase()).unwrap_or(false);
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower)
            {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}

fn camelize(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (snake_to_camel(k), camelize(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(camelize).collect()),
        other => other.clone(),
    }
}

/// Normalize a response body into a plain snake_case mapping.
pub fn as_dict(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, v) in map {
                if v.is_null() {
                    continue;
                }
                if key == "properties" {
                    if let Value::Object(props) = v {
                        if let Value::Object(flat) = as_dict(&Value::Object(props.clone())) {
                            for (k, pv) in flat {
                                out.entry(k).or_insert(pv);
                            }
                        }
                        continue;
                    }
                }
                let snake = camel_to_snake(key);
                let normalized = if VERBATIM.contains(&snake) {
                    v.clone()
                } else {
                    as_dict(v)
                };
                out.insert(snake, normalized);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(as_dict).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    fn kwargs(value: Value) -> HashMap<String, Value> {
        value
            .as_object()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    #[test]
    fn test_camel_to_snake_acronyms() {
        assert_eq!(camel_to_snake("publicIPAddress"), "public_ip_address");
        assert_eq!(camel_to_snake("frontendIPConfigurations"), "frontend_ip_configurations");
        assert_eq!(camel_to_snake("enableIPForwarding"), "enable_ip_forwarding");
        assert_eq!(camel_to_snake("addressPrefix"), "address_prefix");
        assert_eq!(camel_to_snake("saLifeTimeSeconds"), "sa_life_time_seconds");
        assert_eq!(camel_to_snake("id"), "id");
    }

    #[test]
    fn test_build_nested_model() {
        let body = build_object_model(
            Service::Network,
            "VirtualNetwork",
            &kwargs(json!({
                "location": "eastus",
                "tags": {"Env": "dev"},
                "address_space": {"address_prefixes": ["10.0.0.0/16"]},
                "dhcp_options": {"dns_servers": null},
                "resource_group": "ignored",
            })),
        )
        .unwrap();

        assert_eq!(
            body,
            json!({
                "location": "eastus",
                "tags": {"Env": "dev"},
                "properties": {
                    "addressSpace": {"addressPrefixes": ["10.0.0.0/16"]},
                    "dhcpOptions": {}
                }
            })
        );
    }

    #[test]
    fn test_build_reports_missing_required() {
        let err = build_object_model(
            Service::Network,
            "SecurityRule",
            &kwargs(json!({"access": "Allow", "direction": "Inbound"})),
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::Build(ref m) if m.contains("protocol")));
    }

    #[test]
    fn test_build_reports_type_mismatch() {
        let err = build_object_model(
            Service::Network,
            "Subnet",
            &kwargs(json!({"address_prefix": "10.0.0.0/24", "network_security_group": "nsg1"})),
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::Parse(_)));
    }

    #[test]
    fn test_numeric_strings_accepted_for_integers() {
        let body = build_object_model(
            Service::Network,
            "SecurityRule",
            &kwargs(json!({
                "protocol": "Tcp", "access": "Allow", "direction": "Inbound", "priority": "100"
            })),
        )
        .unwrap();
        assert_eq!(body["properties"]["priority"], json!(100));
    }

    #[test]
    fn test_unknown_model() {
        assert!(matches!(
            build_object_model(Service::Network, "Nope", &HashMap::new()),
            Err(ModelError::Build(_))
        ));
    }

    #[test]
    fn test_as_dict_flattens_and_keeps_tags() {
        let wire = json!({
            "id": "/x/nic1",
            "name": "nic1",
            "tags": {"CostCenter": "A1"},
            "properties": {
                "enableIPForwarding": false,
                "macAddress": null,
                "ipConfigurations": [
                    {"name": "ip1", "properties": {"publicIPAddress": {"id": "/x/pip"}}}
                ]
            }
        });
        assert_eq!(
            as_dict(&wire),
            json!({
                "id": "/x/nic1",
                "name": "nic1",
                "tags": {"CostCenter": "A1"},
                "enable_ip_forwarding": false,
                "ip_configurations": [
                    {"name": "ip1", "public_ip_address": {"id": "/x/pip"}}
                ]
            })
        );
    }

    #[test]
    fn test_policy_rule_kept_verbatim() {
        let wire = json!({"properties": {"policyRule": {"if": {"allOf": []}}}});
        assert_eq!(as_dict(&wire), json!({"policy_rule": {"if": {"allOf": []}}}));
    }

    proptest! {
        #[test]
        fn snake_camel_round_trip(words in proptest::collection::vec("[a-z][a-z0-9]{0,6}", 1..5)) {
            let snake = words.join("_");
            let camel = snake_to_camel(&snake);
            // single-letter words make acronym runs, which do not round trip
            prop_assume!(!camel.chars().zip(camel.chars().skip(1)).any(|(a, b)| a.is_uppercase() && b.is_uppercase()));
            prop_assert_eq!(camel_to_snake(&camel), snake);
        }
    }
}
