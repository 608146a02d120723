use std::path::Path;

use chrono::NaiveDate;
use landed_domain::{ExtractionConfig, LoadPattern};
use tracing::debug;

use crate::error::ConfigError;
use crate::raw::RawDocument;

/// Invocation-level overrides a caller applies on top of whatever a document
/// declares (§6 "Invocation" parameters `run_date`, `load_pattern`).
#[derive(Debug, Clone, Copy)]
pub struct LoadOverrides {
    pub run_date: NaiveDate,
    pub load_pattern: Option<LoadPattern>,
}

/// Loads one or more comma-separated document paths (§6) into a flat list of
/// resolved [`ExtractionConfig`]s, applying `overrides` to every source found.
pub fn load_configs(paths: &str, overrides: LoadOverrides) -> Result<Vec<ExtractionConfig>, ConfigError> {
    let mut configs = Vec::new();
    for path in paths.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        configs.extend(load_document(Path::new(path), overrides)?);
    }
    Ok(configs)
}

fn load_document(path: &Path, overrides: LoadOverrides) -> Result<Vec<ExtractionConfig>, ConfigError> {
    let path_str = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path_str.clone(),
        source: e,
    })?;

    let doc: RawDocument = serde_yaml::from_str(&content).map_err(|e| ConfigError::YamlParse {
        path: path_str.clone(),
        source: e,
    })?;

    if doc.sources.is_empty() {
        return Err(ConfigError::EmptyDocument { path: path_str });
    }

    debug!(path = %path_str, count = doc.sources.len(), "loaded configuration document");

    Ok(doc
        .sources
        .into_iter()
        .map(|raw| ExtractionConfig {
            system: raw.system,
            entity: raw.entity,
            run_date: overrides.run_date,
            load_pattern: overrides.load_pattern.unwrap_or(raw.load_pattern),
            source: raw.source,
            output: raw.output,
            resilience: raw.resilience,
            silver: raw.silver,
            storage: raw.storage,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_a_single_source_document() {
        let yaml = r#"
sources:
  - system: crm
    entity: accounts
    load_pattern: full
    source:
      type: file
      glob: "/data/*.csv"
      format: csv
    output:
      format_set: [row]
      max_rows_per_chunk: 1000
      max_bytes_per_chunk: 1048576
    storage:
      backend: local
      container: /tmp/landed
      scope: onprem
"#;
        let file = write_temp(yaml);
        let overrides = LoadOverrides {
            run_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            load_pattern: None,
        };
        let configs = load_document(file.path(), overrides).unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].system.as_str(), "crm");
    }

    #[test]
    fn rejects_document_with_no_sources() {
        let file = write_temp("sources: []\n");
        let overrides = LoadOverrides {
            run_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            load_pattern: None,
        };
        assert!(matches!(
            load_document(file.path(), overrides),
            Err(ConfigError::EmptyDocument { .. })
        ));
    }
}
