use super::{prop, AttrType::*, ModelTable};
use crate::azure::Service;

pub(super) fn models() -> ModelTable {
    vec![(
        Service::Authorization,
        "RoleAssignmentCreateParameters",
        vec![
            prop("role_definition_id", Str).required(),
            prop("principal_id", Str).required(),
            prop("principal_type", Str),
            prop("description", Str),
            prop("condition", Str),
        ],
    )]
}
