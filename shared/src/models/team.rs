//! Team Model

use serde::{Deserialize, Serialize};

/// Longest team id produced by [`Team::slug`]
pub const MAX_TEAM_ID_LEN: usize = 50;

/// Outcome of the last script validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompilationStatus {
    Success,
    Failed,
    #[default]
    Unknown,
}

/// Team entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub display_name: String,
    pub script: String,
    pub printer_enabled: bool,
    pub upload_count: u64,
    pub job_count: u64,
    pub last_activity_time: i64,
    pub last_compilation_status: CompilationStatus,
    pub last_compilation_error: Option<String>,
}

impl Team {
    /// Derive the stable team id from a display name
    ///
    /// Lowercased, every run of non-alphanumeric characters collapsed to a
    /// single `-`, trimmed of separators and capped at [`MAX_TEAM_ID_LEN`].
    /// Returns `None` when nothing alphanumeric remains.
    pub fn slug(display_name: &str) -> Option<String> {
        let mut id = String::with_capacity(display_name.len());
        let mut pending_sep = false;
        for c in display_name.chars().flat_map(char::to_lowercase) {
            if c.is_alphanumeric() {
                if pending_sep && !id.is_empty() {
                    id.push('-');
                }
                pending_sep = false;
                id.push(c);
            } else {
                pending_sep = true;
            }
        }

        if id.chars().count() > MAX_TEAM_ID_LEN {
            id = id.chars().take(MAX_TEAM_ID_LEN).collect();
            while id.ends_with('-') {
                id.pop();
            }
        }

        (!id.is_empty()).then_some(id)
    }

    /// A fresh team record, printing disabled
    pub fn new(id: String, display_name: impl Into<String>, script: impl Into<String>, now: i64) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            script: script.into(),
            printer_enabled: false,
            upload_count: 0,
            job_count: 0,
            last_activity_time: now,
            last_compilation_status: CompilationStatus::Unknown,
            last_compilation_error: None,
        }
    }

    pub fn has_script(&self) -> bool {
        !self.script.trim().is_empty()
    }

    pub fn summary(&self) -> TeamSummary {
        TeamSummary {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            printer_enabled: self.printer_enabled,
            upload_count: self.upload_count,
            job_count: self.job_count,
            last_activity_time: self.last_activity_time,
            last_compilation_status: self.last_compilation_status,
            last_compilation_error: self.last_compilation_error.clone(),
            has_script: self.has_script(),
        }
    }
}

/// Team listing entry (no script body)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    pub id: String,
    pub display_name: String,
    pub printer_enabled: bool,
    pub upload_count: u64,
    pub job_count: u64,
    pub last_activity_time: i64,
    pub last_compilation_status: CompilationStatus,
    pub last_compilation_error: Option<String>,
    pub has_script: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_normalizes_names() {
        assert_eq!(Team::slug("Team Rocket").as_deref(), Some("team-rocket"));
        assert_eq!(Team::slug("  The   A-Team!! ").as_deref(), Some("the-a-team"));
        assert_eq!(Team::slug("__x__y__").as_deref(), Some("x-y"));
        assert_eq!(Team::slug("Ünïcode Crew").as_deref(), Some("ünïcode-crew"));
    }

    #[test]
    fn test_slug_is_deterministic() {
        assert_eq!(Team::slug("Byte Me"), Team::slug("byte-me"));
        assert_eq!(Team::slug("BYTE   ME"), Team::slug("Byte.Me"));
    }

    #[test]
    fn test_slug_rejects_empty() {
        assert_eq!(Team::slug(""), None);
        assert_eq!(Team::slug("!!! ---"), None);
    }

    #[test]
    fn test_slug_is_capped() {
        let long = "a".repeat(49) + " bcd";
        let id = Team::slug(&long).unwrap();
        assert_eq!(id.len(), 49);
        assert!(!id.ends_with('-'));

        let id = Team::slug(&"x".repeat(80)).unwrap();
        assert_eq!(id.len(), MAX_TEAM_ID_LEN);
    }

    #[test]
    fn test_summary_hides_script() {
        let team = Team::new("rockets".into(), "Rockets", "fun interpret() {}", 1);
        let json = serde_json::to_value(team.summary()).unwrap();
        assert_eq!(json["hasScript"], true);
        assert!(json.get("script").is_none());
        assert_eq!(json["lastCompilationStatus"], "UNKNOWN");
    }
}
