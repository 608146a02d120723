use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPattern {
    Full,
    Cdc,
    CurrentHistory,
}

impl std::fmt::Display for LoadPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LoadPattern::Full => "full",
            LoadPattern::Cdc => "cdc",
            LoadPattern::CurrentHistory => "current_history",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Event,
    State,
    DerivedEvent,
    DerivedState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryMode {
    Scd2,
    Scd1,
    LatestOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    AppendLog,
    ReplaceDaily,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteMode {
    Ignore,
    TombstoneState,
    TombstoneEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaMode {
    Strict,
    AllowNewColumns,
}

/// Silver transformation selector (§4.8). Either set explicitly via
/// `silver.model_choice` or derived from `entity_kind × history_mode ×
/// input_mode` by [`Model::derive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Model {
    PeriodicSnapshot,
    FullMergeDedupe,
    ScdType1,
    ScdType2,
    IncrementalMerge,
}

impl Model {
    /// Dispatch table from §4.8's "Dispatch" paragraph: `entity_kind ×
    /// history_mode × input_mode` when `model_choice` is absent.
    pub fn derive(
        entity_kind: EntityKind,
        history_mode: Option<HistoryMode>,
        input_mode: Option<InputMode>,
    ) -> Model {
        match (entity_kind, history_mode, input_mode) {
            (EntityKind::Event, _, Some(InputMode::AppendLog)) => Model::IncrementalMerge,
            (EntityKind::Event, _, Some(InputMode::ReplaceDaily) | None) => Model::PeriodicSnapshot,
            (EntityKind::State, Some(HistoryMode::Scd2), _) => Model::ScdType2,
            (EntityKind::State, Some(HistoryMode::Scd1), _) => Model::ScdType1,
            (EntityKind::State, Some(HistoryMode::LatestOnly) | None, _) => Model::FullMergeDedupe,
            (EntityKind::DerivedEvent, _, _) => Model::IncrementalMerge,
            (EntityKind::DerivedState, Some(HistoryMode::Scd2), _) => Model::ScdType2,
            (EntityKind::DerivedState, _, _) => Model::ScdType1,
        }
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Model::PeriodicSnapshot => "periodic_snapshot",
            Model::FullMergeDedupe => "full_merge_dedupe",
            Model::ScdType1 => "scd_type_1",
            Model::ScdType2 => "scd_type_2",
            Model::IncrementalMerge => "incremental_merge",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_scd2_for_state_scd2() {
        assert_eq!(
            Model::derive(EntityKind::State, Some(HistoryMode::Scd2), None),
            Model::ScdType2
        );
    }

    #[test]
    fn derives_incremental_merge_for_append_log_events() {
        assert_eq!(
            Model::derive(EntityKind::Event, None, Some(InputMode::AppendLog)),
            Model::IncrementalMerge
        );
    }
}
