mod common;

use anyhow::{anyhow, Result};
use common::{at, build_test_context_from, web, BASE_CONFIG};
use oxwatch_common::types::{HostState, NotificationType, NotifyOn, ObjectKey, ServiceState};
use oxwatch_server::config::ServerConfig;
use oxwatch_server::error::EngineError;
use oxwatch_server::object_builder::build_engine;

fn build_error(config: &str) -> Result<EngineError> {
    let config: ServerConfig = toml::from_str(config)?;
    match build_engine(&config) {
        Ok(_) => Err(anyhow!("config should have been rejected")),
        Err(e) => Ok(e),
    }
}

#[test]
fn config_file_loads_with_defaults() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let path = temp_dir.path().join("oxwatch.toml");
    std::fs::write(&path, BASE_CONFIG)?;

    let config = ServerConfig::load(path.to_str().ok_or_else(|| anyhow!("non-utf8 path"))?)?;
    assert_eq!(config.log_filter, "oxwatch=info");
    assert_eq!(config.tick_millis, 1000);
    assert!(config.enable_notifications);
    assert_eq!(config.default_max_attempts, 3);

    assert_eq!(config.hosts.len(), 1);
    assert_eq!(config.hosts[0].max_attempts, Some(1));
    assert_eq!(config.hosts[0].notifications.notification_options, vec!["all"]);
    assert_eq!(config.hosts[0].notifications.notification_interval, 1800);

    let service = &config.services[0];
    assert_eq!(service.max_attempts, None);
    assert!(!service.volatile);
    assert_eq!(service.notifications.notification_interval, 600);
    assert_eq!(service.notifications.notification_period.as_deref(), Some("24x7"));
    assert_eq!(service.notifications.contact_groups, vec!["ops"]);
    Ok(())
}

#[test]
fn missing_config_file_is_an_error() {
    assert!(ServerConfig::load("/nonexistent/oxwatch.toml").is_err());
}

#[test]
fn object_graph_is_built_from_config() -> Result<()> {
    let ctx = build_test_context_from(BASE_CONFIG)?;
    assert_eq!(ctx.engine.objects.len(), 2);
    assert_eq!(ctx.engine.objects.services_of("web-01").count(), 1);

    let object = ctx
        .engine
        .object(&common::http())
        .ok_or_else(|| anyhow!("http should exist"))?;
    let service = object.as_service().ok_or_else(|| anyhow!("http should be a service"))?;
    assert_eq!(service.check.max_attempts, 3);
    assert_eq!(service.notifications.notified_states, NotifyOn::all());
    assert_eq!(service.notifications.flatten_contacts().len(), 2);
    Ok(())
}

#[test]
fn shell_runner_executes_configured_commands() -> Result<()> {
    let config: ServerConfig = toml::from_str(BASE_CONFIG)?;
    let mut engine = build_engine(&config)?;
    engine.process_host_result("web-01", HostState::Down, at(100))?;

    let record = engine
        .dispatcher
        .broker
        .last()
        .ok_or_else(|| anyhow!("a notification should have been recorded"))?;
    assert_eq!(record.kind, NotificationType::Problem);
    assert_eq!(record.object, web());
    assert_eq!(record.contacts_notified, 1);
    Ok(())
}

#[test]
fn notification_options_limit_states() -> Result<()> {
    let config = format!(
        "{BASE_CONFIG}\n[[services]]\nhost = \"web-01\"\nname = \"dns\"\ncontacts = [\"alice\"]\nmax_attempts = 1\nnotification_options = [\"critical\", \"recovery\"]\n"
    );
    let mut ctx = build_test_context_from(&config)?;
    ctx.engine
        .process_service_result("web-01", "dns", ServiceState::Warning, at(100))?;
    assert!(ctx.runner.sent().is_empty());
    ctx.engine
        .process_service_result("web-01", "dns", ServiceState::Critical, at(200))?;
    assert_eq!(ctx.runner.sent().len(), 1);
    Ok(())
}

#[test]
fn service_option_letters_follow_service_states() -> Result<()> {
    let config = format!(
        "{BASE_CONFIG}\n[[services]]\nhost = \"web-01\"\nname = \"dns\"\ncontacts = [\"alice\"]\nmax_attempts = 1\nnotification_options = [\"w\", \"u\", \"c\", \"r\"]\n"
    );
    let mut ctx = build_test_context_from(&config)?;
    let dns = ObjectKey::service("web-01", "dns");
    let object = ctx.engine.object(&dns).ok_or_else(|| anyhow!("dns should exist"))?;
    let service = object.as_service().ok_or_else(|| anyhow!("dns should be a service"))?;
    assert_eq!(
        service.notifications.notified_states,
        NotifyOn::OK | NotifyOn::WARNING | NotifyOn::CRITICAL | NotifyOn::UNKNOWN
    );

    ctx.engine
        .process_service_result("web-01", "dns", ServiceState::Unknown, at(100))?;
    assert_eq!(ctx.runner.sent().len(), 1);

    let host_letter_on_service = format!(
        "{BASE_CONFIG}\n[[services]]\nhost = \"web-01\"\nname = \"dns\"\nnotification_options = [\"d\"]\n"
    );
    assert!(matches!(build_error(&host_letter_on_service)?, EngineError::InvalidConfig(_)));
    Ok(())
}

#[test]
fn unknown_references_are_rejected() -> Result<()> {
    let unknown_contact = format!("{BASE_CONFIG}\n[[hosts]]\nname = \"db-01\"\ncontacts = [\"carol\"]\n");
    assert!(matches!(build_error(&unknown_contact)?, EngineError::UnknownContact(name) if name == "carol"));

    let unknown_period = format!(
        "{BASE_CONFIG}\n[[hosts]]\nname = \"db-01\"\nnotification_period = \"nights\"\n"
    );
    assert!(matches!(build_error(&unknown_period)?, EngineError::UnknownTimePeriod(name) if name == "nights"));

    let unknown_command = BASE_CONFIG.replace(
        "service_notification_commands = [\"notify-by-pager\"]",
        "service_notification_commands = [\"notify-by-sms\"]",
    );
    assert!(matches!(build_error(&unknown_command)?, EngineError::UnknownCommand(name) if name == "notify-by-sms"));

    let unknown_host = format!("{BASE_CONFIG}\n[[services]]\nhost = \"db-01\"\nname = \"mysql\"\n");
    assert!(matches!(build_error(&unknown_host)?, EngineError::UnknownObject(_)));

    let unknown_group = format!("{BASE_CONFIG}\n[[hosts]]\nname = \"db-01\"\ncontact_groups = [\"dba\"]\n");
    assert!(matches!(build_error(&unknown_group)?, EngineError::InvalidConfig(_)));

    let unknown_member = format!("{BASE_CONFIG}\n[[contact_groups]]\nname = \"dba\"\nmembers = [\"carol\"]\n");
    assert!(matches!(build_error(&unknown_member)?, EngineError::UnknownContact(_)));
    Ok(())
}

#[test]
fn malformed_definitions_are_rejected() -> Result<()> {
    let duplicate = format!("{BASE_CONFIG}\n[[hosts]]\nname = \"web-01\"\n");
    assert!(matches!(build_error(&duplicate)?, EngineError::DuplicateObject(_)));

    let bad_option = format!(
        "{BASE_CONFIG}\n[[hosts]]\nname = \"db-01\"\nnotification_options = [\"sometimes\"]\n"
    );
    assert!(matches!(build_error(&bad_option)?, EngineError::InvalidConfig(_)));

    let bad_range = format!("{BASE_CONFIG}\n[[time_periods]]\nname = \"nights\"\nranges = [\"22-06\"]\n");
    assert!(matches!(build_error(&bad_range)?, EngineError::InvalidConfig(_)));

    let bad_weekday = format!(
        "{BASE_CONFIG}\n[[time_periods]]\nname = \"nights\"\nranges = [\"22:00-06:00\"]\nweekdays = [\"someday\"]\n"
    );
    assert!(matches!(build_error(&bad_weekday)?, EngineError::InvalidConfig(_)));
    Ok(())
}
