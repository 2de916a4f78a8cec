use oxwatch_notify::error::{CommandError, Result};
use oxwatch_notify::{CommandRunner, ContactNotification};
use std::collections::HashMap;
use std::process::{Command, Stdio};

/// Runs notification commands through `sh -c`.
///
/// Command lines may use `$MACRO$` placeholders; the same values are also
/// exported as `OXWATCH_<MACRO>` environment variables.
#[derive(Debug, Default)]
pub struct ShellCommandRunner {
    commands: HashMap<String, String>,
}

impl ShellCommandRunner {
    pub fn new(commands: HashMap<String, String>) -> Self {
        Self { commands }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }
}

/// Macro name and value pairs for one contact notification.
pub fn macros(notification: &ContactNotification<'_>) -> Vec<(&'static str, String)> {
    let event = notification.event;
    vec![
        ("NOTIFICATIONTYPE", event.kind.to_string()),
        ("NOTIFICATIONID", event.notification_id.to_string()),
        ("NOTIFICATIONNUMBER", event.notification_number.to_string()),
        ("NOTIFICATIONAUTHOR", event.author.to_string()),
        ("NOTIFICATIONCOMMENT", event.comment.to_string()),
        ("HOSTNAME", event.object.host_name().to_string()),
        (
            "SERVICEDESC",
            event.object.service_name().unwrap_or_default().to_string(),
        ),
        ("STATE", event.state.clone()),
        ("CONTACTNAME", notification.contact.name.clone()),
        ("LONGDATETIME", event.time.to_rfc3339()),
    ]
}

/// Replaces every `$NAME$` placeholder with its macro value.
pub fn expand_macros(line: &str, macros: &[(&'static str, String)]) -> String {
    macros.iter().fold(line.to_string(), |acc, (name, value)| {
        acc.replace(&format!("${name}$"), value)
    })
}

impl CommandRunner for ShellCommandRunner {
    fn run(&mut self, notification: &ContactNotification<'_>) -> Result<()> {
        let template = self
            .commands
            .get(notification.command)
            .ok_or_else(|| CommandError::UnknownCommand(notification.command.to_string()))?;

        let macros = macros(notification);
        let line = expand_macros(template, &macros);

        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(&line)
            .stdin(Stdio::null())
            .stdout(Stdio::null());
        for (name, value) in &macros {
            command.env(format!("OXWATCH_{name}"), value);
        }

        let status = command.status().map_err(|source| CommandError::Spawn {
            command: notification.command.to_string(),
            source,
        })?;
        if !status.success() {
            return Err(CommandError::NonZeroExit {
                command: notification.command.to_string(),
                status: status.to_string(),
            });
        }
        tracing::debug!(
            contact = %notification.contact.name,
            command = notification.command,
            "Notification command completed"
        );
        Ok(())
    }
}
