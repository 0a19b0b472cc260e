//! `azurearm_resource` state functions: resource groups, policy definitions
//! and policy assignments.

use serde_json::{json, Map, Value};
use std::fs;

use super::{deep_diff, or_return, Compare, Field, Presence, StateReturn, StateRun};
use crate::azure::ids;
use crate::modules::arm::{error_value, is_error, truthy};
use crate::modules::resource::{self as res, MODULE};
use crate::modules::{register_states, ModuleContext, ModuleParams, ModuleRegistry, ModuleResult};

const ALREADY_ABSENT: &str = "is already absent.";

async fn group_exists(run: &StateRun<'_>) -> ModuleResult<bool> {
    let exists = res::resource_group_check_existence(run.ctx, &run.lookup(&[])).await?;
    Ok(exists.as_bool().unwrap_or(false))
}

/// Resource group `name` in `location`. Only `tags` are compared once the
/// group exists.
pub async fn resource_group_present(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let mut run = or_return!(StateRun::start(ctx, params, "Resource group")?);

    if group_exists(&run).await? {
        let group = res::resource_group_get(ctx, &run.lookup(&[])).await?;
        let tags = group.get("tags").cloned().unwrap_or_else(|| json!({}));
        let wanted = match run.arg("tags") {
            Value::Null => json!({}),
            tags => tags,
        };
        let changes = deep_diff(&tags, &wanted);
        if changes.is_empty() {
            let comment = format!("Resource group {} is already present.", run.name());
            return Ok(run.finish(Some(true), comment));
        }
        if run.is_test() {
            run.change("old", tags);
            run.change("new", run.arg("tags"));
            let comment = format!("Resource group {} tags would be updated.", run.name());
            return Ok(run.finish(None, comment));
        }
        run.ret.changes = changes;
    } else {
        run.creating(json!({
            "name": run.name(),
            "location": run.arg("location"),
            "managed_by": run.arg("managed_by"),
            "tags": run.arg("tags"),
        }));
        if let Some(ret) = run.would_create() {
            return Ok(ret);
        }
    }

    let group = res::resource_group_create_or_update(ctx, &run.call_params(&[])).await?;
    if group_exists(&run).await? {
        run.creating(group);
        return Ok(run.created(&Value::Bool(true)));
    }
    let outcome = if is_error(&group) { group } else { Value::Null };
    Ok(run.created(&outcome))
}

pub async fn resource_group_absent(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let run = or_return!(StateRun::start(ctx, params, "Resource group")?).missing_as(ALREADY_ABSENT);
    let group = if group_exists(&run).await? {
        res::resource_group_get(ctx, &run.lookup(&[])).await?
    } else {
        error_value("Resource group not found.")
    };
    run.absent(group, |p| async move { res::resource_group_delete(ctx, &p).await })
        .await
}

const RULE_SOURCES: &str = "\"policy_rule\", \"policy_rule_json\", or \"policy_rule_file\"";

/// Definition fields carried in the `properties` of a rule document, by the
/// argument they stand for.
const RULE_PROPERTIES: [(&str, &str); 7] = [
    ("policy_rule", "policyRule"),
    ("policy_type", "policyType"),
    ("mode", "mode"),
    ("display_name", "displayName"),
    ("description", "description"),
    ("parameters", "parameters"),
    ("metadata", "metadata"),
];

const DEFINITION_FIELDS: [&str; 6] = [
    "policy_type",
    "mode",
    "display_name",
    "description",
    "metadata",
    "parameters",
];

/// Desired definition arguments with the rule taken from whichever source
/// was given, or the failure comment.
fn definition_arguments(params: &ModuleParams) -> Result<ModuleParams, String> {
    let given = |key: &str| params.get(key).filter(|v| !v.is_null());
    let sources = ["policy_rule", "policy_rule_json", "policy_rule_file"];
    if !sources.iter().any(|key| truthy(params.get(*key))) {
        return Err(format!("One of {} is required!", RULE_SOURCES));
    }
    if sources.iter().filter(|key| given(**key).is_some()).count() > 1 {
        return Err(format!("Only one of {} is allowed!", RULE_SOURCES));
    }
    let document = match (given("policy_rule_json"), given("policy_rule_file")) {
        (Some(text), _) => Some(text.as_str().unwrap_or_default().to_string()),
        (None, Some(path)) => {
            let path = path.as_str().unwrap_or_default();
            Some(fs::read_to_string(path).map_err(|e| {
                format!("Unable to read policy rule file {}! ({})", path, e)
            })?)
        }
        (None, None) => None,
    };
    let Some(document) = document else {
        return Ok(params.clone());
    };
    if DEFINITION_FIELDS.iter().any(|key| truthy(params.get(*key))) {
        return Err(
            "Policy definitions cannot be passed when \"policy_rule_json\" or \"policy_rule_file\" is defined!"
                .to_string(),
        );
    }

    let rule: Value = serde_json::from_str(&document)
        .map_err(|e| format!("Unable to load policy rule json! ({})", e))?;
    let mut out = params.clone();
    match rule.get("properties") {
        Some(properties) => {
            for (argument, property) in RULE_PROPERTIES {
                if let Some(value) = properties.get(property) {
                    out.insert(argument.to_string(), value.clone());
                }
            }
        }
        None => {
            out.insert("policy_rule".to_string(), rule);
        }
    }
    Ok(out)
}

fn text_field(key: &'static str) -> Field {
    Field::new(key, Compare::CaseInsensitive)
        .or(json!(""))
        .actual_or(json!(""))
}

fn mapping_field(key: &'static str) -> Field {
    Field::new(key, Compare::Deep)
        .or(json!({}))
        .actual_or(json!({}))
}

/// Custom policy definition `name`. The rule is given inline as
/// `policy_rule`, or as a JSON document in `policy_rule_json` or the file
/// `policy_rule_file`; a document with `properties` supplies the other
/// definition fields too.
pub async fn policy_definition_present(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let mut run = or_return!(StateRun::start(ctx, params, "Policy definition")?);
    let desired = match definition_arguments(params) {
        Ok(desired) => desired,
        Err(comment) => return Ok(run.fail(comment)),
    };

    let policy = res::policy_definition_get(ctx, &run.lookup(&[])).await?;
    if !is_error(&policy) {
        let fields = [
            text_field("policy_type").when(Presence::Truthy),
            text_field("mode"),
            text_field("display_name"),
            text_field("description"),
            mapping_field("policy_rule"),
            mapping_field("metadata"),
            mapping_field("parameters"),
        ];
        or_return!(run.diff_with(&desired, &policy, &fields));
        if let Some(ret) = run.settle() {
            return Ok(ret);
        }
    } else {
        let mut new: Map<String, Value> = RULE_PROPERTIES
            .iter()
            .map(|(key, _)| {
                let value = desired.get(*key).cloned().unwrap_or(Value::Null);
                (key.to_string(), value)
            })
            .collect();
        new.insert("name".to_string(), json!(run.name()));
        run.creating(Value::Object(new));
    }
    if let Some(ret) = run.would_create() {
        return Ok(ret);
    }

    let extra: Vec<(&str, Value)> = RULE_PROPERTIES
        .iter()
        .map(|(key, _)| (*key, desired.get(*key).cloned().unwrap_or(Value::Null)))
        .collect();
    let created = res::policy_definition_create_or_update(ctx, &run.call_params(&extra)).await?;
    Ok(run.created(&created))
}

pub async fn policy_definition_absent(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let run =
        or_return!(StateRun::start(ctx, params, "Policy definition")?).missing_as(ALREADY_ABSENT);
    let policy = res::policy_definition_get(ctx, &run.lookup(&[])).await?;
    run.absent(policy, |p| async move {
        res::policy_definition_delete(ctx, &p).await
    })
    .await
}

/// Assignment `name` of the definition `definition_name` at `scope`.
pub async fn policy_assignment_present(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let mut run = or_return!(StateRun::start(ctx, params, "Policy assignment")?);

    let policy = res::policy_assignment_get(ctx, &run.lookup(&[])).await?;
    if !is_error(&policy) {
        let fields = [
            text_field("assignment_type")
                .at("type")
                .report("type")
                .when(Presence::Truthy),
            text_field("scope"),
            text_field("display_name"),
            text_field("description"),
            mapping_field("parameters"),
        ];
        or_return!(run.diff(&policy, &fields));

        let current = policy
            .get("policy_definition_id")
            .and_then(Value::as_str)
            .map(ids::name_from_id)
            .unwrap_or_default();
        let wanted = run.arg("definition_name");
        if !wanted
            .as_str()
            .is_some_and(|w| w.eq_ignore_ascii_case(current))
        {
            run.change("definition_name", json!({ "old": current, "new": wanted }));
        }
        if let Some(ret) = run.settle() {
            return Ok(ret);
        }
    } else {
        run.creating(json!({
            "name": run.name(),
            "scope": run.arg("scope"),
            "definition_name": run.arg("definition_name"),
            "type": run.arg("assignment_type"),
            "display_name": run.arg("display_name"),
            "description": run.arg("description"),
            "parameters": run.arg("parameters"),
        }));
    }
    if let Some(ret) = run.would_create() {
        return Ok(ret);
    }

    let kwargs = run.call_params(&[("type", run.arg("assignment_type"))]);
    let created = res::policy_assignment_create(ctx, &kwargs).await?;
    Ok(run.created(&created))
}

pub async fn policy_assignment_absent(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<StateReturn> {
    let run =
        or_return!(StateRun::start(ctx, params, "Policy assignment")?).missing_as(ALREADY_ABSENT);
    let policy = res::policy_assignment_get(ctx, &run.lookup(&[])).await?;
    run.absent(policy, |p| async move {
        res::policy_assignment_delete(ctx, &p).await
    })
    .await
}

pub fn register(registry: &mut ModuleRegistry) {
    register_states!(
        registry,
        MODULE,
        [
            resource_group_present,
            resource_group_absent,
            policy_definition_present,
            policy_definition_absent,
            policy_assignment_present,
            policy_assignment_absent,
        ]
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn params(pairs: &[(&str, Value)]) -> ModuleParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_definition_requires_a_rule() {
        let err = definition_arguments(&params(&[("mode", json!("All"))])).unwrap_err();
        assert_eq!(
            err,
            "One of \"policy_rule\", \"policy_rule_json\", or \"policy_rule_file\" is required!"
        );
        let err = definition_arguments(&params(&[
            ("policy_rule", json!({"if": {}})),
            ("policy_rule_json", json!("{}")),
        ]))
        .unwrap_err();
        assert!(err.starts_with("Only one of"));
    }

    #[test]
    fn test_definition_json_with_properties() {
        let document = json!({
            "properties": {
                "displayName": "Allowed locations",
                "mode": "Indexed",
                "policyRule": {"if": {"field": "location"}, "then": {"effect": "deny"}},
            }
        })
        .to_string();
        let desired = definition_arguments(&params(&[("policy_rule_json", json!(document))])).unwrap();
        assert_eq!(desired["display_name"], json!("Allowed locations"));
        assert_eq!(desired["policy_rule"]["then"]["effect"], json!("deny"));
    }

    #[test]
    fn test_definition_json_rejects_extra_fields() {
        let err = definition_arguments(&params(&[
            ("policy_rule_json", json!("{}")),
            ("mode", json!("All")),
        ]))
        .unwrap_err();
        assert!(err.starts_with("Policy definitions cannot be passed"));

        let err = definition_arguments(&params(&[("policy_rule_json", json!("{not json"))])).unwrap_err();
        assert!(err.starts_with("Unable to load policy rule json! ("));
    }

    #[test]
    fn test_definition_rule_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"if": {{"field": "type"}}, "then": {{"effect": "audit"}}}}"#).unwrap();
        let path = file.path().to_string_lossy().to_string();
        let desired = definition_arguments(&params(&[("policy_rule_file", json!(path))])).unwrap();
        assert_eq!(desired["policy_rule"]["then"]["effect"], json!("audit"));
    }
}
