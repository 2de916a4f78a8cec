use crate::config::{
    ContactConfig, ContactGroupConfig, NotificationConfig, ServerConfig, TimePeriodConfig,
};
use crate::dispatch::Dispatcher;
use crate::error::{EngineError, Result};
use crate::period::{TimePeriod, TimePeriodTable, TimeRange};
use crate::runner::ShellCommandRunner;
use crate::state::Engine;
use chrono::Weekday;
use oxwatch_check::{Host, Service};
use oxwatch_common::types::{NotifyOn, ObjectKey};
use oxwatch_notify::contact::{Contact, ContactGroup};
use oxwatch_notify::notifier::Notifier;
use oxwatch_notify::state::NotificationState;
use oxwatch_notify::CommandRunner;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Builds a live engine from configuration, running notification commands
/// through the shell.
pub fn build_engine(config: &ServerConfig) -> Result<Engine> {
    let commands: HashMap<String, String> = config
        .commands
        .iter()
        .map(|c| (c.name.clone(), c.command_line.clone()))
        .collect();
    build_engine_with_runner(config, Box::new(ShellCommandRunner::new(commands)))
}

/// Like [`build_engine`] with a caller-supplied command runner.
///
/// Every name referenced by the definitions must resolve: time periods,
/// commands, contacts, contact groups and the host of each service.
pub fn build_engine_with_runner(
    config: &ServerConfig,
    runner: Box<dyn CommandRunner>,
) -> Result<Engine> {
    let periods = build_time_periods(&config.time_periods)?;
    let command_names: Vec<&str> = config.commands.iter().map(|c| c.name.as_str()).collect();

    let mut contacts = BTreeMap::new();
    for def in &config.contacts {
        let contact = build_contact(def, &periods, &command_names)?;
        contacts.insert(def.name.clone(), Arc::new(contact));
    }

    let mut groups = BTreeMap::new();
    for def in &config.contact_groups {
        groups.insert(def.name.clone(), Arc::new(build_group(def, &contacts)?));
    }

    let mut engine = Engine::new(Dispatcher::new(
        Notifier::new(config.enable_notifications),
        periods,
        runner,
    ));

    for def in &config.hosts {
        let mut host = Host::new(
            def.name.clone(),
            def.max_attempts.unwrap_or(config.default_max_attempts),
        );
        apply_notifications(
            &mut host.notifications,
            &def.notifications,
            true,
            &contacts,
            &groups,
            &engine.dispatcher.periods,
        )?;
        engine.add_object(host)?;
    }

    for def in &config.services {
        let host_key = ObjectKey::host(def.host.clone());
        if !engine.objects.contains(&host_key) {
            return Err(EngineError::UnknownObject(host_key.to_string()));
        }
        let mut service = Service::new(
            def.host.clone(),
            def.name.clone(),
            def.max_attempts.unwrap_or(config.default_max_attempts),
        );
        service.volatile = def.volatile;
        apply_notifications(
            &mut service.notifications,
            &def.notifications,
            false,
            &contacts,
            &groups,
            &engine.dispatcher.periods,
        )?;
        engine.add_object(service)?;
    }

    tracing::info!(
        hosts = config.hosts.len(),
        services = config.services.len(),
        contacts = contacts.len(),
        contact_groups = groups.len(),
        "Object graph built"
    );
    Ok(engine)
}

fn build_time_periods(defs: &[TimePeriodConfig]) -> Result<TimePeriodTable> {
    let mut table = TimePeriodTable::new();
    for def in defs {
        let ranges = def
            .ranges
            .iter()
            .map(|r| {
                TimeRange::parse(r).ok_or_else(|| {
                    EngineError::InvalidConfig(format!("time period '{}': bad range '{r}'", def.name))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let weekdays = def
            .weekdays
            .iter()
            .map(|d| {
                d.parse::<Weekday>().map_err(|_| {
                    EngineError::InvalidConfig(format!("time period '{}': bad weekday '{d}'", def.name))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        table.insert(TimePeriod {
            name: def.name.clone(),
            ranges,
            weekdays,
        });
    }
    Ok(table)
}

fn parse_options(options: &[String], is_host: bool) -> Result<NotifyOn> {
    options.iter().try_fold(NotifyOn::empty(), |acc, name| {
        NotifyOn::parse_option(name, is_host)
            .map(|flag| acc | flag)
            .map_err(EngineError::InvalidConfig)
    })
}

fn check_period(period: Option<&str>, periods: &TimePeriodTable) -> Result<()> {
    match period {
        Some(name) if !periods.contains_period(name) => {
            Err(EngineError::UnknownTimePeriod(name.to_string()))
        }
        _ => Ok(()),
    }
}

fn build_contact(
    def: &ContactConfig,
    periods: &TimePeriodTable,
    command_names: &[&str],
) -> Result<Contact> {
    check_period(def.notification_period.as_deref(), periods)?;
    for command in def
        .host_notification_commands
        .iter()
        .chain(&def.service_notification_commands)
    {
        if !command_names.contains(&command.as_str()) {
            return Err(EngineError::UnknownCommand(command.clone()));
        }
    }

    Ok(Contact {
        name: def.name.clone(),
        host_notifications_enabled: def.host_notifications_enabled,
        service_notifications_enabled: def.service_notifications_enabled,
        host_notification_options: parse_options(&def.host_notification_options, true)?,
        service_notification_options: parse_options(&def.service_notification_options, false)?,
        host_notification_commands: def.host_notification_commands.clone(),
        service_notification_commands: def.service_notification_commands.clone(),
        notification_period: def.notification_period.clone(),
    })
}

fn build_group(
    def: &ContactGroupConfig,
    contacts: &BTreeMap<String, Arc<Contact>>,
) -> Result<ContactGroup> {
    let members = def
        .members
        .iter()
        .map(|name| {
            contacts
                .get(name)
                .cloned()
                .ok_or_else(|| EngineError::UnknownContact(name.clone()))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(ContactGroup::new(def.name.clone(), members))
}

fn apply_notifications(
    state: &mut NotificationState,
    def: &NotificationConfig,
    is_host: bool,
    contacts: &BTreeMap<String, Arc<Contact>>,
    groups: &BTreeMap<String, Arc<ContactGroup>>,
    periods: &TimePeriodTable,
) -> Result<()> {
    check_period(def.notification_period.as_deref(), periods)?;

    for name in &def.contacts {
        let contact = contacts
            .get(name)
            .ok_or_else(|| EngineError::UnknownContact(name.clone()))?;
        state.add_contact(Arc::clone(contact));
    }
    for name in &def.contact_groups {
        let group = groups
            .get(name)
            .ok_or_else(|| EngineError::InvalidConfig(format!("unknown contact group '{name}'")))?;
        state.add_contact_group(Arc::clone(group));
    }

    state.notified_states = parse_options(&def.notification_options, is_host)?;
    state.notifications_enabled = def.notifications_enabled;
    state.notification_interval = def.notification_interval;
    state.notification_period = def.notification_period.clone();
    state.first_notification_delay = def.first_notification_delay;
    state.recovery_notification_delay = def.recovery_notification_delay;
    Ok(())
}
