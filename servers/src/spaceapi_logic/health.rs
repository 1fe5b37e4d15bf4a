use chrono::{DateTime, Local, SecondsFormat};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::process::Command;

const GIT_VERSION_FILE: &str = "git-version.txt";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HealthReport {
    pub api_version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_version: Option<String>,
    pub timestamp: String,
    pub uptime: String,
}

/// Process facts reported by `/health`.
#[derive(Debug, Clone)]
pub struct HealthInfo {
    started_at: DateTime<Local>,
    git_version: Option<String>,
}

impl HealthInfo {
    pub fn new(started_at: DateTime<Local>, git_version: Option<String>) -> Self {
        Self {
            started_at,
            git_version,
        }
    }

    /// Captures the start time now and looks up the build's git version.
    pub fn detect() -> Self {
        Self::new(Local::now(), load_git_version(Path::new(GIT_VERSION_FILE)))
    }

    pub fn report(&self, now: DateTime<Local>) -> HealthReport {
        HealthReport {
            api_version: "v0",
            git_version: self.git_version.clone(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Micros, false),
            uptime: iso8601_duration(now - self.started_at),
        }
    }
}

/// First line of `version_file`, or `git describe` of the working tree.
pub fn load_git_version(version_file: &Path) -> Option<String> {
    if let Ok(contents) = fs::read_to_string(version_file) {
        if let Some(line) = contents.lines().next() {
            let line = line.trim();
            if !line.is_empty() {
                return Some(line.to_string());
            }
        }
    }

    match Command::new("git")
        .args(["describe", "--always", "--dirty"])
        .output()
    {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
            (!version.is_empty()).then_some(version)
        }
        Ok(output) => {
            log::warn!(
                "Checking git version lead to non-zero return code {:?}",
                output.status.code()
            );
            None
        }
        Err(e) => {
            log::warn!("Could not run git to determine the version: {}", e);
            None
        }
    }
}

/// Formats a duration as ISO 8601, e.g. `P1DT2H3M4.5S`.
pub fn iso8601_duration(duration: chrono::TimeDelta) -> String {
    let total_micros = duration.num_microseconds().unwrap_or(i64::MAX).max(0);
    let micros = total_micros % 1_000_000;
    let total_secs = total_micros / 1_000_000;
    let days = total_secs / 86_400;
    let hours = total_secs % 86_400 / 3_600;
    let minutes = total_secs % 3_600 / 60;
    let seconds = total_secs % 60;

    let mut out = String::from("P");
    if days > 0 {
        out.push_str(&format!("{}D", days));
    }
    if hours == 0 && minutes == 0 && seconds == 0 && micros == 0 {
        if days == 0 {
            out.push_str("T0S");
        }
        return out;
    }

    out.push('T');
    if hours > 0 {
        out.push_str(&format!("{}H", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}M", minutes));
    }
    if seconds > 0 || micros > 0 {
        if micros > 0 {
            let fraction = format!("{:06}", micros);
            out.push_str(&format!("{}.{}S", seconds, fraction.trim_end_matches('0')));
        } else {
            out.push_str(&format!("{}S", seconds));
        }
    }
    out
}
