use anyhow::Result;
use credkit_common::compact_ids::compact_id;
use credkit_common::logging::{Component, LogLevel, Logger, LoggingConfig};

#[test]
fn config_drives_logger_initialisation() -> Result<()> {
    let config: LoggingConfig = serde_json::from_str(r#"{ "level": "trace" }"#)?;
    assert_eq!(config.level, LogLevel::Trace);
    config.init()?;
    // A second init keeps the first logger.
    LoggingConfig::new().with_level(LogLevel::Off).init()?;

    let logger = Logger::new_root(Component::Custom("app"), "store-1").with_label("device");
    logger.debug("debug line");
    logger.info(format!("info line {}", 1));
    logger.warn_args(format_args!("warn line {}", 2));
    logger.error("error line");
    Ok(())
}

#[test]
fn component_chain_is_tracked() {
    let root = Logger::new_root(Component::Keys, "ctx");
    let store = root.with_component(Component::Store);
    assert_eq!(store.component(), Component::Store);
    assert_eq!(store.context(), "ctx");
    assert_eq!(store.label(), None);
    assert_eq!(Component::Custom("x").as_str(), "x");
}

#[test]
fn compact_ids_differ_per_key() {
    assert_ne!(compact_id(&[0x04; 65]), compact_id(&[0x04; 97]));
}
