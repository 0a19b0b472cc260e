use super::{prop, top, AttrType::*, ModelTable};
use crate::azure::Service;

pub(super) fn models() -> ModelTable {
    let c = Service::Compute;
    vec![
        (c, "SubResource", vec![top("id", Str)]),
        (
            c,
            "Sku",
            vec![top("name", Str), top("tier", Str), top("capacity", Int)],
        ),
        (
            c,
            "AvailabilitySet",
            vec![
                top("id", Str),
                top("location", Str).required(),
                top("tags", Map),
                top("sku", Model("Sku")),
                prop("platform_update_domain_count", Int),
                prop("platform_fault_domain_count", Int),
                prop("virtual_machines", ModelList("SubResource")),
                prop("proximity_placement_group", Model("SubResource")),
            ],
        ),
        (
            c,
            "ImageOSDisk",
            vec![
                top("os_type", Str).required(),
                top("os_state", Str).required(),
                top("snapshot", Model("SubResource")),
                top("managed_disk", Model("SubResource")),
                top("blob_uri", Str),
                top("caching", Str),
                top("disk_size_gb", Int).wire("diskSizeGB"),
                top("storage_account_type", Str),
            ],
        ),
        (
            c,
            "ImageDataDisk",
            vec![
                top("lun", Int).required(),
                top("snapshot", Model("SubResource")),
                top("managed_disk", Model("SubResource")),
                top("blob_uri", Str),
                top("caching", Str),
                top("disk_size_gb", Int).wire("diskSizeGB"),
                top("storage_account_type", Str),
            ],
        ),
        (
            c,
            "ImageStorageProfile",
            vec![
                top("os_disk", Model("ImageOSDisk")),
                top("data_disks", ModelList("ImageDataDisk")),
                top("zone_resilient", Bool),
            ],
        ),
        (
            c,
            "Image",
            vec![
                top("id", Str),
                top("location", Str).required(),
                top("tags", Map),
                prop("source_virtual_machine", Model("SubResource")),
                prop("storage_profile", Model("ImageStorageProfile")),
                prop("hyper_v_generation", Str).wire("hyperVGeneration"),
            ],
        ),
        (
            c,
            "VirtualMachineCaptureParameters",
            vec![
                top("vhd_prefix", Str).required(),
                top("destination_container_name", Str).required(),
                top("overwrite_vhds", Bool).required(),
            ],
        ),
    ]
}
