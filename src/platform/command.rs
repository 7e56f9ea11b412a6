//! Desktop notifications through an external helper process.

use super::{DesktopNotifier, HostOs};
use crate::error::ChronosError;
use std::process::{Command, Stdio};

/// Program and arguments for one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifierInvocation {
    pub program: &'static str,
    pub args: Vec<String>,
}

/// Build the notifier invocation for `os`, or `None` when the OS has no notifier.
#[must_use]
pub fn notification_command(
    os: HostOs,
    title: &str,
    body: &str,
    expire_ms: u32,
) -> Option<NotifierInvocation> {
    match os {
        HostOs::Linux => Some(NotifierInvocation {
            program: "notify-send",
            args: vec![
                "--icon=dialog-information".to_owned(),
                format!("--expire-time={expire_ms}"),
                title.to_owned(),
                body.to_owned(),
            ],
        }),
        HostOs::MacOs => {
            let script = format!(
                "display notification \"{}\" with title \"{}\" sound name \"Glass\"",
                applescript_escape(body),
                applescript_escape(title)
            );
            Some(NotifierInvocation {
                program: "osascript",
                args: vec!["-e".to_owned(), script],
            })
        }
        HostOs::Windows => {
            let script = format!(
                "Add-Type -AssemblyName System.Windows.Forms; \
                 $n = New-Object System.Windows.Forms.NotifyIcon; \
                 $n.Icon = [System.Drawing.SystemIcons]::Information; \
                 $n.Visible = $true; \
                 $n.ShowBalloonTip({expire_ms}, \"{}\", \"{}\", [System.Windows.Forms.ToolTipIcon]::Info)",
                powershell_escape(title),
                powershell_escape(body)
            );
            Some(NotifierInvocation {
                program: "powershell",
                args: vec![
                    "-WindowStyle".to_owned(),
                    "Hidden".to_owned(),
                    "-Command".to_owned(),
                    script,
                ],
            })
        }
        HostOs::Other => None,
    }
}

fn applescript_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn powershell_escape(s: &str) -> String {
    s.replace('`', "``")
        .replace('"', "`\"")
        .replace('$', "`$")
}

/// Notifier that spawns the host's notification helper.
pub struct CommandNotifier {
    os: HostOs,
    expire_ms: u32,
}

impl CommandNotifier {
    /// Notifier for `os` with the given popup lifetime hint.
    #[must_use]
    pub fn new(os: HostOs, expire_ms: u32) -> Self {
        Self { os, expire_ms }
    }

    fn program(&self) -> Option<&'static str> {
        notification_command(self.os, "", "", self.expire_ms).map(|inv| inv.program)
    }
}

impl DesktopNotifier for CommandNotifier {
    fn name(&self) -> &'static str {
        self.program().unwrap_or("command")
    }

    fn is_available(&self) -> bool {
        self.program()
            .is_some_and(|program| which::which(program).is_ok())
    }

    fn notify(&self, title: &str, body: &str) -> anyhow::Result<()> {
        let Some(invocation) = notification_command(self.os, title, body, self.expire_ms) else {
            anyhow::bail!("no desktop notifier for {:?}", self.os);
        };

        let mut child = Command::new(invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ChronosError::Notify(format!("cannot spawn {}: {e}", invocation.program)))?;

        // Reap in the background; the caller never waits on the popup.
        std::thread::spawn(move || {
            let _ = child.wait();
        });
        Ok(())
    }
}
