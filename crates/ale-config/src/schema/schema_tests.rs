use super::*;

#[test]
fn test_config_default() {
    let config = Config::default();
    assert_eq!(config.engine, CycleConfig::default());
    assert_eq!(config.logging.level, "info");
    assert!(config.logging.directory.is_none());
    assert!(config.cycle_names().is_empty());
}

#[test]
fn test_logging_config_default() {
    let logging = LoggingConfig::default();
    assert_eq!(logging.file_prefix, "ale");
    assert_eq!(logging.max_log_files, 14);
    assert!(!logging.json);
}

#[test]
fn test_reader_config_defaults() {
    let reader: ReaderConfig = toml::from_str(r#"name = "dock""#).unwrap();
    assert_eq!(reader.period_ms, 500);
    assert!(reader.epcs.is_empty());
    assert!(reader.gpio_period_ms.is_none());
}

#[test]
fn test_cycle_names_span_all_kinds() {
    let config: Config = toml::from_str(
        r#"
        [[event_cycles]]
        name = "a"
        [[command_cycles]]
        name = "b"
        [[port_cycles]]
        name = "c"
        "#,
    )
    .unwrap();
    assert_eq!(config.cycle_names(), vec!["a", "b", "c"]);
}

#[test]
fn test_command_cycle_spec() {
    let config: Config = toml::from_str(
        r#"
        [[command_cycles]]
        name = "encode"

        [command_cycles.spec]
        logicalReaders = ["station"]

        [command_cycles.spec.boundarySpec]
        tagsProcessedCount = 5
        afterError = true

        [[command_cycles.spec.cmdSpecs]]
        name = "read-user"
        filter = ["3034"]

        [[command_cycles.spec.cmdSpecs.operations]]
        name = "user"
        kind = "READ"
        bank = 3
        length = 2
        "#,
    )
    .unwrap();
    let spec = &config.command_cycles[0].spec;
    assert_eq!(spec.boundary_spec.tags_processed_count, Some(5));
    assert!(spec.boundary_spec.after_error);
    assert_eq!(spec.cmd_specs[0].operations[0].length, 2);
}

#[test]
fn test_subscriber_uris_default() {
    assert_eq!(subscriber_uris("dock", &[]), vec!["log:dock"]);
    let configured = vec!["log:a".to_string(), "log:b".to_string()];
    assert_eq!(subscriber_uris("dock", &configured), configured);
}
