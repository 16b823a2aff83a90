use super::status::EntryStatus;
use chrono::{Local, NaiveDate};
use serde::Serialize;

/// One timesheet entry.
///
/// Drafts may be partial: date, project and description are nullable in the
/// store and the natural key (date, project, description) is only enforced
/// when all three are present.
#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    pub id: i64,
    pub date: Option<NaiveDate>,     // ⇔ entries.date (TEXT "YYYY-MM-DD")
    pub hours: f64,                  // ⇔ entries.hours (REAL, quarter-hour steps)
    pub project: Option<String>,     // ⇔ entries.project
    pub tool: Option<String>,        // ⇔ entries.tool
    pub charge_code: Option<String>, // ⇔ entries.charge_code
    pub description: Option<String>, // ⇔ entries.description
    pub status: EntryStatus,         // ⇔ entries.status (NULL | 'Submitting' | 'Complete')
    pub started_at: Option<String>,  // ⇔ entries.started_at (set while InProgress)
    pub submitted_at: Option<String>, // ⇔ entries.submitted_at (TEXT, ISO8601)
    pub created_at: String,          // ⇔ entries.created_at
    pub updated_at: String,          // ⇔ entries.updated_at
}

impl Entry {
    /// High-level constructor for drafts saved from the UI/CLI.
    /// New entries always start Pending with no submission timestamp.
    pub fn draft(
        date: Option<NaiveDate>,
        hours: f64,
        project: Option<String>,
        tool: Option<String>,
        charge_code: Option<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            id: 0,
            date,
            hours,
            project,
            tool,
            charge_code,
            description,
            status: EntryStatus::Pending,
            started_at: None,
            submitted_at: None,
            created_at: Local::now().to_rfc3339(),
            updated_at: Local::now().to_rfc3339(),
        }
    }

    pub fn date_str(&self) -> Option<String> {
        self.date.map(|d| d.format("%Y-%m-%d").to_string())
    }
}

/// Quarter-hour duration domain, mirrored by the CHECK constraint on
/// entries.hours. Enforced here too so callers get a typed error before
/// hitting the store.
pub fn valid_hours(hours: f64) -> bool {
    (0.25..=24.0).contains(&hours) && (hours * 4.0).fract() == 0.0
}
