use serde::{Deserialize, Serialize};

/// Who initiated a booking. Provenance only — never used for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "smallint")]
#[repr(i16)]
pub enum Origin {
    Client = 0,
    Admin = 1,
}

/// Appointment lifecycle states. Stored as smallint, kebab-case on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "smallint")]
#[repr(i16)]
pub enum AppointmentStatus {
    Pending = 0,
    Confirmed = 1,
    InProgress = 2,
    Completed = 3,
    Cancelled = 4,
}

impl AppointmentStatus {
    /// Client bookings start pending; admin bookings are confirmed on entry.
    pub fn initial_for(origin: Origin) -> Self {
        match origin {
            Origin::Client => AppointmentStatus::Pending,
            Origin::Admin => AppointmentStatus::Confirmed,
        }
    }

    /// Terminal by convention; nothing blocks leaving these states.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled
        )
    }

    /// The standard lifecycle path: pending -> confirmed -> in-progress ->
    /// completed, with cancellation allowed from any non-terminal state.
    /// Advisory only — admins may force any status onto any appointment, and
    /// off-path moves are logged, not rejected.
    pub fn is_standard_transition(from: Self, to: Self) -> bool {
        use AppointmentStatus::*;
        match (from, to) {
            (Pending, Confirmed) | (Confirmed, InProgress) | (InProgress, Completed) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::InProgress => "in-progress",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AppointmentStatus::*;

    #[test]
    fn initial_status_tracks_origin() {
        assert_eq!(AppointmentStatus::initial_for(Origin::Client), Pending);
        assert_eq!(AppointmentStatus::initial_for(Origin::Admin), Confirmed);
    }

    #[test]
    fn terminal_states() {
        assert!(Completed.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(!Pending.is_terminal());
        assert!(!Confirmed.is_terminal());
        assert!(!InProgress.is_terminal());
    }

    #[test]
    fn standard_path_is_forward_only() {
        assert!(AppointmentStatus::is_standard_transition(Pending, Confirmed));
        assert!(AppointmentStatus::is_standard_transition(Confirmed, InProgress));
        assert!(AppointmentStatus::is_standard_transition(InProgress, Completed));
        assert!(!AppointmentStatus::is_standard_transition(Pending, Completed));
        assert!(!AppointmentStatus::is_standard_transition(Completed, InProgress));
    }

    #[test]
    fn cancellation_from_any_live_state() {
        assert!(AppointmentStatus::is_standard_transition(Pending, Cancelled));
        assert!(AppointmentStatus::is_standard_transition(Confirmed, Cancelled));
        assert!(AppointmentStatus::is_standard_transition(InProgress, Cancelled));
        assert!(!AppointmentStatus::is_standard_transition(Completed, Cancelled));
        assert!(!AppointmentStatus::is_standard_transition(Cancelled, Cancelled));
    }

    #[test]
    fn wire_format_is_kebab_case() {
        assert_eq!(serde_json::to_string(&InProgress).unwrap(), "\"in-progress\"");
        let parsed: AppointmentStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(parsed, Cancelled);
    }
}
