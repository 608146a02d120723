use std::io::Write;

use chrono::NaiveDate;
use landed_config::{load_configs, LoadOverrides};

fn overrides() -> LoadOverrides {
    LoadOverrides {
        run_date: NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
        load_pattern: None,
    }
}

#[test]
fn loads_multiple_sources_from_one_document() {
    let yaml = r#"
sources:
  - system: crm
    entity: accounts
    load_pattern: full
    source:
      type: file
      glob: "/data/accounts/*.csv"
      format: csv
    output:
      format_set: [row]
      max_rows_per_chunk: 5000
      max_bytes_per_chunk: 10485760
    storage:
      backend: local
      container: /tmp/landed
      scope: onprem
  - system: crm
    entity: orders
    load_pattern: cdc
    source:
      type: http
      base_url: "https://api.example.com"
      endpoint: "/v1/orders"
      record_path: "$.data"
    output:
      format_set: [columnar]
      max_rows_per_chunk: 5000
      max_bytes_per_chunk: 10485760
    storage:
      backend: local
      container: /tmp/landed
      scope: onprem
"#;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    let configs = load_configs(file.path().to_str().unwrap(), overrides()).unwrap();
    assert_eq!(configs.len(), 2);
    assert_eq!(configs[0].entity.as_str(), "accounts");
    assert_eq!(configs[1].entity.as_str(), "orders");
}

#[test]
fn run_date_override_wins_over_document() {
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
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    let configs = load_configs(file.path().to_str().unwrap(), overrides()).unwrap();
    assert_eq!(configs[0].run_date, overrides().run_date);
}

#[test]
fn missing_file_is_a_config_error() {
    let result = load_configs("/nonexistent/path/does/not/exist.yml", overrides());
    assert!(result.is_err());
}

#[test]
fn rejects_identifiers_with_invalid_characters() {
    let yaml = r#"
sources:
  - system: "crm prod"
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
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    assert!(load_configs(file.path().to_str().unwrap(), overrides()).is_err());
}
