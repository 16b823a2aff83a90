use serde::Serialize;

/// Lifecycle state of a timesheet entry.
///
/// Pending is represented by a NULL status column so that freshly saved
/// drafts need no explicit value. The two non-null states keep the wire
/// values used by earlier releases ('Submitting', 'Complete').
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum EntryStatus {
    Pending,
    InProgress,
    Complete,
}

impl EntryStatus {
    /// Convert enum → DB value (None maps to a NULL column).
    pub fn to_db_str(&self) -> Option<&'static str> {
        match self {
            EntryStatus::Pending => None,
            EntryStatus::InProgress => Some("Submitting"),
            EntryStatus::Complete => Some("Complete"),
        }
    }

    /// Convert DB value → enum.
    pub fn from_db_str(s: Option<&str>) -> Option<Self> {
        match s {
            None => Some(EntryStatus::Pending),
            Some("Submitting") => Some(EntryStatus::InProgress),
            Some("Complete") => Some(EntryStatus::Complete),
            Some(_) => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, EntryStatus::Pending)
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, EntryStatus::Complete)
    }
}
