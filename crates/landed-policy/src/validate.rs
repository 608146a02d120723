use landed_domain::{EntityKind, ExtractionConfig, StorageScope};

use crate::error::PolicyError;

/// Column-name shape: the same charset as `landed_domain`'s identifier
/// newtypes, but applied to the plain strings that make up `natural_keys`
/// and `partition_by` (those fields predate any domain ID wrapper).
fn is_column_shaped(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// The Policy Gate (C9, §4.9): runs once per config, before a Bronze or
/// Silver run is allowed to touch storage. Collects every violation rather
/// than stopping at the first, so an operator fixing a config sees the
/// whole list in one pass.
///
/// `backend_kind` is the kind reported by the resolved `StorageBackend`
/// (e.g. `"local"`, `"s3"`, `"azure"`); `onprem_allow_list` names the backend
/// kinds permitted for a `StorageScope::Onprem` run.
pub fn validate(
    config: &ExtractionConfig,
    backend_kind: &str,
    onprem_allow_list: &[String],
) -> Result<(), PolicyError> {
    let mut errors: Vec<PolicyError> = Vec::new();

    if config.storage.scope == StorageScope::Onprem
        && !onprem_allow_list.iter().any(|kind| kind == backend_kind)
    {
        errors.push(PolicyError::violation(
            "storage_scope_boundary",
            format!(
                "storage scope is onprem but backend '{backend_kind}' is not in the onprem allow-list {onprem_allow_list:?}"
            ),
        ));
    }

    if config.storage.boundary.is_none() {
        errors.push(PolicyError::violation(
            "storage_boundary_missing",
            "storage.boundary must be set to a named network/security boundary".to_string(),
        ));
    }

    if config.storage.provider_type.is_none() {
        errors.push(PolicyError::violation(
            "storage_provider_type_missing",
            "storage.provider_type must identify the concrete provider (e.g. 's3', 'azure-blob', 'local-fs')".to_string(),
        ));
    }

    if let Some(silver) = &config.silver {
        match silver.entity_kind {
            EntityKind::State | EntityKind::DerivedState => {
                if silver.natural_keys.is_empty() {
                    errors.push(PolicyError::violation(
                        "silver_natural_keys_required",
                        format!(
                            "entity_kind {:?} requires at least one natural key column",
                            silver.entity_kind
                        ),
                    ));
                }
            }
            EntityKind::Event | EntityKind::DerivedEvent => {
                if silver.event_ts_column.is_none() {
                    errors.push(PolicyError::violation(
                        "silver_event_ts_required",
                        format!(
                            "entity_kind {:?} requires event_ts_column",
                            silver.entity_kind
                        ),
                    ));
                }
            }
        }

        for key in &silver.natural_keys {
            if !is_column_shaped(key) {
                errors.push(PolicyError::violation(
                    "silver_column_name_invalid",
                    format!("natural_keys entry '{key}' is not a valid column name"),
                ));
            }
        }
        for key in &silver.partition_by {
            if !is_column_shaped(key) {
                errors.push(PolicyError::violation(
                    "silver_column_name_invalid",
                    format!("partition_by entry '{key}' is not a valid column name"),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else if errors.len() == 1 {
        Err(errors.remove(0))
    } else {
        Err(PolicyError::Multiple(errors))
    }
}
