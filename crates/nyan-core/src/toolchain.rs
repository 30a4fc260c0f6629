//! Helpers for getting the assistant CLI onto a developer machine: locating
//! the npm global directory, checking PATH, and the Windows package list.

use std::process::{Command, Stdio};
use tracing::debug;

#[derive(thiserror::Error, Debug)]
pub enum ToolchainError {
    #[error("npm not found. Install Node.js first.")]
    NpmMissing,
    #[error("winget not found. Please install App Installer from Microsoft Store.")]
    WingetMissing,
    #[error("Command `{command}` failed with {status}")]
    CommandFailed { command: String, status: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Posix,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WingetPackage {
    pub id: &'static str,
    pub description: &'static str,
}

pub const WINGET_PACKAGES: [WingetPackage; 3] = [
    WingetPackage { id: "Microsoft.WindowsTerminal", description: "Windows Terminal" },
    WingetPackage { id: "Microsoft.PowerShell", description: "PowerShell 7" },
    WingetPackage { id: "Git.Git", description: "Git" },
];

pub const ASSISTANT_PACKAGE: &str = "@anthropic-ai/claude-code";

pub fn assistant_install_command() -> String {
    format!("npm install -g {}", ASSISTANT_PACKAGE)
}

pub fn winget_install_command(package: &WingetPackage) -> String {
    format!(
        "winget install {} --accept-source-agreements --accept-package-agreements -e",
        package.id
    )
}

pub fn setx_command(npm_prefix: &str) -> String {
    format!("setx PATH \"%PATH%;{}\"", npm_prefix)
}

pub fn posix_export_line(npm_prefix: &str) -> String {
    format!("export PATH=\"$PATH:{}\"", npm_prefix)
}

pub fn path_contains(path_var: &str, dir: &str) -> bool {
    path_var.contains(dir)
}

/// The rc file a POSIX user should edit, picked from `$SHELL`.
pub fn shell_rc_file(shell: Option<&str>) -> &'static str {
    match shell {
        Some(shell) if shell.contains("zsh") => "~/.zshrc",
        _ => "~/.bashrc",
    }
}

fn shell_command(command_line: &str) -> Command {
    let mut command = if cfg!(windows) {
        let mut command = Command::new("cmd");
        command.arg("/C");
        command
    } else {
        let mut command = Command::new("sh");
        command.arg("-c");
        command
    };
    command.arg(command_line);
    command
}

/// Runs a command line through the platform shell with inherited stdio.
pub fn run_shell(command_line: &str) -> Result<(), ToolchainError> {
    debug!("Running: {}", command_line);
    let status = shell_command(command_line).status()?;

    if !status.success() {
        return Err(ToolchainError::CommandFailed {
            command: command_line.to_string(),
            status: status.to_string(),
        });
    }
    Ok(())
}

/// True when the command line runs and exits successfully; output is discarded.
pub fn probe(command_line: &str) -> bool {
    shell_command(command_line)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

pub fn npm_global_prefix() -> Result<String, ToolchainError> {
    let output = shell_command("npm config get prefix")
        .stderr(Stdio::null())
        .output()
        .map_err(|_| ToolchainError::NpmMissing)?;

    if !output.status.success() {
        return Err(ToolchainError::NpmMissing);
    }

    let prefix = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if prefix.is_empty() {
        return Err(ToolchainError::NpmMissing);
    }
    debug!("npm global prefix: {}", prefix);
    Ok(prefix)
}

pub fn ensure_winget() -> Result<(), ToolchainError> {
    if probe("winget --version") {
        Ok(())
    } else {
        Err(ToolchainError::WingetMissing)
    }
}
