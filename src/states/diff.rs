//! Declarative comparison of desired keyword arguments against a fetched
//! resource.
//!
//! A present state lists the [`Field`]s it manages; [`compute_diff`] walks
//! them and returns the changes mapping, or the comment of the first field
//! that could not be compared.

use serde_json::{json, Map, Value};
use std::collections::BTreeSet;

use crate::azure::ids;
use crate::modules::arm::truthy;
use crate::modules::ModuleParams;

/// How a desired value is compared with the actual one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compare {
    Exact,
    /// Both sides lowercased
    CaseInsensitive,
    /// Desired value capitalized, actual value as is
    Capitalized,
    /// Desired value parsed as an integer
    Integer,
    /// Symmetric difference of both lists
    Set,
    SortedList,
    SortedListCaseInsensitive,
    /// [`deep_diff`] of two mappings; the pruned result is the change
    Deep,
    /// Desired name against the last segment of the actual `id`
    IdName,
    /// Each desired key against the same key of the actual mapping
    Keys {
        label: &'static str,
        case_insensitive: bool,
    },
    /// [`compare_list_of_dicts`] with the given reference keys
    ListOfDicts { id_keys: &'static [&'static str] },
}

/// When a field takes part in the comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Always,
    /// Only when the desired value is truthy
    Truthy,
    /// Only when the desired value is given and not null
    NotNull,
}

/// One managed field of a resource.
#[derive(Debug, Clone)]
pub struct Field {
    key: &'static str,
    actual: &'static str,
    report: &'static str,
    compare: Compare,
    presence: Presence,
    desired_default: Option<Value>,
    actual_default: Option<Value>,
}

impl Field {
    /// Field `key`, read from the same key of the resource and reported
    /// under it.
    pub fn new(key: &'static str, compare: Compare) -> Self {
        Self {
            key,
            actual: key,
            report: key,
            compare,
            presence: Presence::Always,
            desired_default: None,
            actual_default: None,
        }
    }

    /// Dotted path of the value in the resource.
    pub fn at(mut self, path: &'static str) -> Self {
        self.actual = path;
        self
    }

    /// Dotted path of the change in the changes mapping.
    pub fn report(mut self, path: &'static str) -> Self {
        self.report = path;
        self
    }

    pub fn when(mut self, presence: Presence) -> Self {
        self.presence = presence;
        self
    }

    /// Value compared when the desired one is missing or null.
    pub fn or(mut self, default: Value) -> Self {
        self.desired_default = Some(default);
        self
    }

    /// Value compared when the resource lacks the field.
    pub fn actual_or(mut self, default: Value) -> Self {
        self.actual_default = Some(default);
        self
    }

    /// `tags`, compared with [`deep_diff`] against an empty default.
    pub fn tags() -> Self {
        Self::new("tags", Compare::Deep)
            .or(json!({}))
            .actual_or(json!({}))
    }
}

/// Value at a dotted path.
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, key| current.get(key))
        .filter(|v| !v.is_null())
}

/// Set `value` at a dotted path, creating intermediate mappings.
fn insert_at(changes: &mut Map<String, Value>, path: &str, value: Value) {
    let mut parts = path.split('.').peekable();
    let mut current = changes;
    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            current.insert(part.to_string(), value);
            return;
        }
        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        current = next;
    }
}

fn lower(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.to_lowercase()),
        other => other.clone(),
    }
}

/// First character upper case, the rest lower case.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn as_items(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

fn item_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Last `/` segment of the `id` of a reference mapping.
fn id_name(value: Option<&Value>) -> Option<String> {
    value
        .and_then(|v| v.get("id"))
        .and_then(|id| id.as_str())
        .map(|id| ids::name_from_id(id).to_string())
}

fn old_new(old: Option<&Value>, new: Option<&Value>) -> Value {
    json!({
        "old": old.cloned().unwrap_or(Value::Null),
        "new": new.cloned().unwrap_or(Value::Null),
    })
}

/// Compare `desired` against `actual` over `fields`.
///
/// Returns the changes mapping (empty when nothing differs), or the comment
/// of the first field whose desired value has the wrong shape.
pub fn compute_diff(
    desired: &ModuleParams,
    actual: &Value,
    fields: &[Field],
) -> Result<Map<String, Value>, String> {
    let mut changes = Map::new();

    for field in fields {
        let given = desired.get(field.key).filter(|v| !v.is_null());
        let included = match field.presence {
            Presence::Always => true,
            Presence::Truthy => truthy(given),
            Presence::NotNull => given.is_some(),
        };
        if !included {
            continue;
        }

        let raw_actual = lookup(actual, field.actual);
        let want = given.or(field.desired_default.as_ref());
        let have = raw_actual.or(field.actual_default.as_ref());

        let change = match &field.compare {
            Compare::Exact => (want != have).then(|| old_new(raw_actual, given)),
            Compare::CaseInsensitive => {
                (want.map(lower) != have.map(lower)).then(|| old_new(raw_actual, given))
            }
            Compare::Capitalized => {
                let want = want.map(|w| match w {
                    Value::String(s) => Value::String(capitalize(s)),
                    other => other.clone(),
                });
                (want.as_ref() != have).then(|| old_new(raw_actual, given))
            }
            Compare::Integer => {
                let want = want.and_then(as_integer);
                let have = have.and_then(|h| h.as_i64());
                (want != have).then(|| old_new(raw_actual, given))
            }
            Compare::Set => {
                let want: BTreeSet<String> = as_items(want).iter().map(item_key).collect();
                let have_items = as_items(have);
                let have_set: BTreeSet<String> = have_items.iter().map(item_key).collect();
                (want != have_set).then(|| {
                    json!({ "old": Value::Array(have_items), "new": given.cloned().unwrap_or(Value::Null) })
                })
            }
            Compare::SortedList | Compare::SortedListCaseInsensitive => {
                let fold = |items: Vec<Value>| {
                    let mut keys: Vec<String> = items.iter().map(item_key).collect();
                    if field.compare == Compare::SortedListCaseInsensitive {
                        keys = keys.into_iter().map(|k| k.to_lowercase()).collect();
                    }
                    keys.sort();
                    keys
                };
                (fold(as_items(want)) != fold(as_items(have)))
                    .then(|| old_new(raw_actual, given))
            }
            Compare::Deep => {
                let old = have.cloned().unwrap_or_else(|| json!({}));
                let new = want.cloned().unwrap_or_else(|| json!({}));
                let diff = deep_diff(&old, &new);
                (!diff.is_empty()).then_some(Value::Object(diff))
            }
            Compare::IdName => {
                let name = id_name(raw_actual);
                let want = want.and_then(|w| w.as_str()).map(str::to_string);
                (want != name).then(|| {
                    json!({
                        "old": name,
                        "new": given.cloned().unwrap_or(Value::Null),
                    })
                })
            }
            Compare::Keys {
                label,
                case_insensitive,
            } => {
                let Some(Value::Object(wanted)) = want else {
                    return Err(format!("{} must be provided as a dictionary!", label));
                };
                let differs = wanted.iter().any(|(key, value)| {
                    let current = have.and_then(|h| h.get(key)).filter(|v| !v.is_null());
                    if *case_insensitive {
                        Some(lower(value)) != current.map(lower).or(Some(json!("")))
                    } else {
                        Some(value) != current
                    }
                });
                differs.then(|| old_new(raw_actual, given))
            }
            Compare::ListOfDicts { id_keys } => {
                let old = have.cloned().unwrap_or_else(|| json!([]));
                let new = want.cloned().unwrap_or(Value::Null);
                match compare_list_of_dicts(&old, &new, id_keys) {
                    Ok(change) => change,
                    Err(comment) => return Err(format!("\"{}\" {}", field.key, comment)),
                }
            }
        };

        if let Some(change) = change {
            insert_at(&mut changes, field.report, change);
        }
    }

    Ok(changes)
}

fn name_of(config: &Value) -> Result<String, &'static str> {
    match config {
        Value::Object(map) => match map.get("name") {
            Some(name) => Ok(item_key(name)),
            None => Err("configuration dictionaries must contain the \"name\" key!"),
        },
        _ => Err("configurations must be provided as a list of dictionaries!"),
    }
}

fn sorted_by_name(configs: &[Value]) -> Result<Vec<Value>, &'static str> {
    let mut keyed = configs
        .iter()
        .map(|c| name_of(c).map(|n| (n, c.clone())))
        .collect::<Result<Vec<_>, _>>()?;
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(keyed.into_iter().map(|(_, c)| c).collect())
}

/// Compare a list of named sub-resource configurations.
///
/// Entries are matched by `name` after sorting. Every key given in a new
/// entry is compared with the old entry; strings case-insensitively, and
/// keys in `id_keys` against the name at the end of the old entry's `id`.
/// Returns `{"old", "new"}` when anything differs.
pub fn compare_list_of_dicts(
    old: &Value,
    new: &Value,
    id_keys: &[&str],
) -> Result<Option<Value>, String> {
    let Value::Array(new_items) = new else {
        return Err("must be provided as a list of dictionaries!".to_string());
    };
    let old_items = as_items(Some(old));
    if new_items.len() != old_items.len() {
        return Ok(Some(json!({ "old": old_items, "new": new_items })));
    }

    let local = sorted_by_name(new_items).map_err(str::to_string)?;
    let remote = sorted_by_name(&old_items).map_err(str::to_string)?;

    for (wanted, current) in local.iter().zip(&remote) {
        let Value::Object(wanted) = wanted else {
            continue;
        };
        for (key, value) in wanted {
            let differs = if id_keys.contains(&key.as_str()) {
                let name = id_name(current.get(key)).unwrap_or_default();
                value.as_str() != Some(name.as_str())
            } else {
                let remote_value = current.get(key).cloned().unwrap_or(Value::Null);
                lower(value) != lower(&remote_value)
            };
            if differs {
                return Ok(Some(json!({ "old": remote, "new": local })));
            }
        }
    }
    Ok(None)
}

/// Remove keys equal on both sides, recursing into nested mappings.
fn prune(old: &mut Map<String, Value>, new: &mut Map<String, Value>) {
    let keys: BTreeSet<String> = old.keys().chain(new.keys()).cloned().collect();
    for key in keys {
        if let (Some(Value::Object(o)), Some(Value::Object(n))) = (old.get_mut(&key), new.get_mut(&key)) {
            if o != n {
                prune(o, n);
            }
        }
        if old.contains_key(&key) && old.get(&key) == new.get(&key) {
            old.remove(&key);
            new.remove(&key);
        }
    }
}

/// Difference of two mappings with every equal key pruned, as
/// `{"old": ..., "new": ...}`. Sides left empty are omitted, so equal
/// mappings give an empty result.
pub fn deep_diff(old: &Value, new: &Value) -> Map<String, Value> {
    let mut result = Map::new();
    match (old, new) {
        (Value::Object(o), Value::Object(n)) => {
            let (mut o, mut n) = (o.clone(), n.clone());
            prune(&mut o, &mut n);
            if !o.is_empty() {
                result.insert("old".to_string(), Value::Object(o));
            }
            if !n.is_empty() {
                result.insert("new".to_string(), Value::Object(n));
            }
        }
        _ if old != new => {
            result.insert("old".to_string(), old.clone());
            result.insert("new".to_string(), new.clone());
        }
        _ => {}
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn desired(pairs: Value) -> ModuleParams {
        match pairs {
            Value::Object(map) => map.into_iter().collect(),
            _ => ModuleParams::new(),
        }
    }

    #[test]
    fn test_deep_diff_prunes_nested_equal_keys() {
        let old = json!({"env": "prod", "owner": {"team": "net", "oncall": "a"}});
        let new = json!({"env": "prod", "owner": {"team": "net", "oncall": "b"}, "cost": "1"});
        assert_eq!(
            Value::Object(deep_diff(&old, &new)),
            json!({
                "old": {"owner": {"oncall": "a"}},
                "new": {"owner": {"oncall": "b"}, "cost": "1"}
            })
        );
        assert!(deep_diff(&old, &old).is_empty());
    }

    #[test]
    fn test_set_compare_reports_nested_path() {
        let fields = [Field::new("address_prefixes", Compare::Set)
            .at("address_space.address_prefixes")
            .report("address_space.address_prefixes")];
        let actual = json!({"address_space": {"address_prefixes": ["10.0.0.0/16"]}});

        let same = desired(json!({"address_prefixes": ["10.0.0.0/16", "10.0.0.0/16"]}));
        assert!(compute_diff(&same, &actual, &fields).unwrap().is_empty());

        let wider = desired(json!({"address_prefixes": ["10.0.0.0/16", "10.1.0.0/16"]}));
        let changes = compute_diff(&wider, &actual, &fields).unwrap();
        assert_eq!(
            Value::Object(changes),
            json!({"address_space": {"address_prefixes": {
                "old": ["10.0.0.0/16"],
                "new": ["10.0.0.0/16", "10.1.0.0/16"]
            }}})
        );
    }

    #[test]
    fn test_scalar_compares() {
        let fields = [
            Field::new("access", Compare::Capitalized),
            Field::new("priority", Compare::Integer),
            Field::new("protocol", Compare::CaseInsensitive).actual_or(json!("")),
            Field::new("mac_address", Compare::Exact).when(Presence::Truthy),
        ];
        let actual = json!({"access": "Allow", "priority": 100, "protocol": "TCP"});
        let wanted = desired(json!({"access": "allow", "priority": "100", "protocol": "tcp"}));
        assert!(compute_diff(&wanted, &actual, &fields).unwrap().is_empty());

        let wanted = desired(json!({"access": "deny", "priority": 101, "protocol": "udp"}));
        let changes = compute_diff(&wanted, &actual, &fields).unwrap();
        assert_eq!(changes["access"], json!({"old": "Allow", "new": "deny"}));
        assert_eq!(changes["priority"], json!({"old": 100, "new": 101}));
        assert!(changes.contains_key("protocol"));
        assert!(!changes.contains_key("mac_address"));
    }

    #[test]
    fn test_id_name_and_keys() {
        let fields = [
            Field::new("security_group", Compare::IdName)
                .at("network_security_group")
                .report("network_security_group")
                .when(Presence::Truthy),
            Field::new(
                "dns_settings",
                Compare::Keys {
                    label: "DNS settings",
                    case_insensitive: true,
                },
            )
            .when(Presence::Truthy),
        ];
        let actual = json!({
            "network_security_group": {"id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/networkSecurityGroups/nsg1"},
            "dns_settings": {"internal_dns_name_label": "Web"}
        });
        let wanted = desired(json!({"security_group": "nsg2", "dns_settings": {"internal_dns_name_label": "web"}}));
        let changes = compute_diff(&wanted, &actual, &fields).unwrap();
        assert_eq!(
            changes["network_security_group"],
            json!({"old": "nsg1", "new": "nsg2"})
        );
        assert!(!changes.contains_key("dns_settings"));

        let wanted = desired(json!({"dns_settings": "web"}));
        assert_eq!(
            compute_diff(&wanted, &actual, &fields).unwrap_err(),
            "DNS settings must be provided as a dictionary!"
        );
    }

    #[test]
    fn test_compare_list_of_dicts() {
        let old = json!([
            {"name": "b", "priority": 200, "protocol": "Tcp"},
            {"name": "a", "subnet": {"id": "/x/subnets/front"}}
        ]);
        let same = json!([{"name": "a", "subnet": "front"}, {"name": "b", "protocol": "tcp"}]);
        assert_eq!(compare_list_of_dicts(&old, &same, &["subnet"]).unwrap(), None);

        let moved = json!([{"name": "a", "subnet": "back"}, {"name": "b"}]);
        let change = compare_list_of_dicts(&old, &moved, &["subnet"]).unwrap().unwrap();
        assert_eq!(change["new"][0]["subnet"], json!("back"));
        assert_eq!(change["old"][0]["name"], json!("a"));

        let shorter = json!([{"name": "a"}]);
        assert!(compare_list_of_dicts(&old, &shorter, &[]).unwrap().is_some());

        assert_eq!(
            compare_list_of_dicts(&old, &json!({"name": "a"}), &[]).unwrap_err(),
            "must be provided as a list of dictionaries!"
        );
        assert_eq!(
            compare_list_of_dicts(&old, &json!([{"name": "a"}, {"priority": 1}]), &[]).unwrap_err(),
            "configuration dictionaries must contain the \"name\" key!"
        );
        assert_eq!(
            compare_list_of_dicts(&old, &json!(["a", "b"]), &[]).unwrap_err(),
            "configurations must be provided as a list of dictionaries!"
        );
    }

    #[test]
    fn test_list_comment_names_field() {
        let fields = [Field::new(
            "security_rules",
            Compare::ListOfDicts { id_keys: &[] },
        )
        .when(Presence::Truthy)];
        let wanted = desired(json!({"security_rules": [{"priority": 100}]}));
        let err = compute_diff(&wanted, &json!({"security_rules": [{"name": "x"}]}), &fields)
            .unwrap_err();
        assert_eq!(
            err,
            "\"security_rules\" configuration dictionaries must contain the \"name\" key!"
        );
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("sTANDARD"), "Standard");
        assert_eq!(capitalize(""), "");
    }
}
