use serde::{Deserialize, Serialize};

use crate::core::shared::error::ApiError;

/// Lifecycle of a contact through outreach.
///
/// `new → assigned → attended_to → archived | flagged → ready_to_export → exported`.
/// Any state except `exported` may also be flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    New,
    Assigned,
    AttendedTo,
    Archived,
    Flagged,
    ReadyToExport,
    Exported,
}

impl ContactStatus {
    pub const ALL: [ContactStatus; 7] = [
        Self::New,
        Self::Assigned,
        Self::AttendedTo,
        Self::Archived,
        Self::Flagged,
        Self::ReadyToExport,
        Self::Exported,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == value.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Assigned => "assigned",
            Self::AttendedTo => "attended_to",
            Self::Archived => "archived",
            Self::Flagged => "flagged",
            Self::ReadyToExport => "ready_to_export",
            Self::Exported => "exported",
        }
    }

    pub fn can_transition_to(self, next: ContactStatus) -> bool {
        use ContactStatus::*;

        if self == next {
            return true;
        }
        if self == Exported {
            return false;
        }
        if next == Flagged {
            return true;
        }
        matches!(
            (self, next),
            (New, Assigned)
                | (Assigned, AttendedTo)
                | (AttendedTo, Archived)
                | (Archived, ReadyToExport)
                | (Flagged, ReadyToExport)
                | (ReadyToExport, Exported)
        )
    }

    pub fn transition(self, next: ContactStatus) -> Result<ContactStatus, ApiError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ApiError::field(
                "status",
                format!(
                    "Invalid status transition from '{}' to '{}'.",
                    self.as_str(),
                    next.as_str()
                ),
            ))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Failed,
    Completed,
    Busy,
}

impl CallStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "failed" => Some(Self::Failed),
            "completed" => Some(Self::Completed),
            "busy" => Some(Self::Busy),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Failed => "failed",
            Self::Completed => "completed",
            Self::Busy => "busy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupContactStatus {
    AttendedTo,
    NotAttended,
    FollowUp,
}

impl GroupContactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AttendedTo => "attended_to",
            Self::NotAttended => "not_attended",
            Self::FollowUp => "follow_up",
        }
    }
}

/// Shared by agents and their call group memberships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveStatus {
    Active,
    Disabled,
}

impl ActiveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Disabled => "disabled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ContactStatus::*;

    #[test]
    fn test_forward_chain() {
        let chain = [New, Assigned, AttendedTo, Archived, ReadyToExport, Exported];
        for pair in chain.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?}", pair);
        }
        assert!(AttendedTo.can_transition_to(Flagged));
        assert!(Flagged.can_transition_to(ReadyToExport));
    }

    #[test]
    fn test_flagging_and_terminal_state() {
        for status in [New, Assigned, AttendedTo, Archived, ReadyToExport] {
            assert!(status.can_transition_to(Flagged));
        }
        assert!(!Exported.can_transition_to(Flagged));
        assert!(!Exported.can_transition_to(New));
        assert!(Exported.can_transition_to(Exported));
    }

    #[test]
    fn test_rejected_jumps() {
        assert!(!New.can_transition_to(AttendedTo));
        assert!(!New.can_transition_to(Exported));
        assert!(!Assigned.can_transition_to(New));
        assert!(!Flagged.can_transition_to(Archived));

        match New.transition(Exported) {
            Err(ApiError::Fields(errors)) => assert_eq!(
                errors.get("status"),
                Some(&["Invalid status transition from 'new' to 'exported'.".to_string()][..])
            ),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!(ContactStatus::parse("ready_to_export"), Some(ReadyToExport));
        assert_eq!(ContactStatus::parse(" New "), Some(New));
        assert_eq!(ContactStatus::parse("verified"), None);
        assert_eq!(CallStatus::parse("busy"), Some(CallStatus::Busy));
        assert_eq!(CallStatus::parse("dropped"), None);
    }
}
