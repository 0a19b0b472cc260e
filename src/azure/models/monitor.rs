use super::{prop, top, AttrType::*, ModelTable};
use crate::azure::Service;

pub(super) fn models() -> ModelTable {
    let m = Service::Monitor;
    vec![
        (
            m,
            "RetentionPolicy",
            vec![top("enabled", Bool).required(), top("days", Int).required()],
        ),
        (
            m,
            "MetricSettings",
            vec![
                top("time_grain", Str),
                top("category", Str),
                top("enabled", Bool).required(),
                top("retention_policy", Model("RetentionPolicy")),
            ],
        ),
        (
            m,
            "LogSettings",
            vec![
                top("category", Str),
                top("category_group", Str),
                top("enabled", Bool).required(),
                top("retention_policy", Model("RetentionPolicy")),
            ],
        ),
        (
            m,
            "DiagnosticSettingsResource",
            vec![
                prop("storage_account_id", Str),
                prop("service_bus_rule_id", Str),
                prop("event_hub_authorization_rule_id", Str),
                prop("event_hub_name", Str),
                prop("metrics", ModelList("MetricSettings")),
                prop("logs", ModelList("LogSettings")),
                prop("workspace_id", Str),
                prop("log_analytics_destination_type", Str),
            ],
        ),
    ]
}
