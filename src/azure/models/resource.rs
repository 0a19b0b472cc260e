use super::{prop, top, AttrType::*, ModelTable};
use crate::azure::Service;

fn link() -> Vec<super::Attr> {
    vec![top("uri", Str).required(), top("content_version", Str)]
}

pub(super) fn models() -> ModelTable {
    let r = Service::Resource;
    let p = Service::Policy;
    let l = Service::ManagementLock;
    vec![
        (
            r,
            "ResourceGroup",
            vec![
                top("location", Str).required(),
                top("managed_by", Str),
                top("tags", Map),
            ],
        ),
        (r, "TemplateLink", link()),
        (r, "ParametersLink", link()),
        (r, "DebugSetting", vec![top("detail_level", Str)]),
        (
            r,
            "DeploymentProperties",
            vec![
                top("template", Map),
                top("template_link", Model("TemplateLink")),
                top("parameters", Map),
                top("parameters_link", Model("ParametersLink")),
                top("mode", Str).required(),
                top("debug_setting", Model("DebugSetting")),
            ],
        ),
        (
            p,
            "PolicyDefinition",
            vec![
                prop("policy_type", Str),
                prop("mode", Str),
                prop("display_name", Str),
                prop("description", Str),
                prop("policy_rule", Map),
                prop("metadata", Map),
                prop("parameters", Map),
            ],
        ),
        (
            p,
            "PolicyAssignment",
            vec![
                top("location", Str),
                prop("display_name", Str),
                prop("policy_definition_id", Str),
                prop("scope", Str),
                prop("not_scopes", StrList),
                prop("parameters", Map),
                prop("description", Str),
                prop("metadata", Map),
                prop("enforcement_mode", Str),
            ],
        ),
        (l, "ManagementLockOwner", vec![top("application_id", Str)]),
        (
            l,
            "ManagementLockObject",
            vec![
                prop("level", Str).required(),
                prop("notes", Str),
                prop("owners", ModelList("ManagementLockOwner")),
            ],
        ),
    ]
}
