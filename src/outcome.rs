/*!
The typed outcome a round reports to the enclosing session orchestrator (spec §7).
*/

/// The result of driving a single round to completion or to a stop.
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    /// `true` if the round produced a correct result agreed on by honest participants.
    pub successful: bool,
    /// `true` if the round was stopped early by a transport event (e.g. a server disconnected)
    /// rather than by a protocol fault. No one is blamed in this case.
    pub interrupted: bool,
    /// Indices (within the [`Group`](crate::group::Group)) of participants identified as
    /// misbehaving, if any.
    pub bad_members: Vec<u32>,
    /// Human-readable explanation, for logging.
    pub reason: Option<String>,
}

impl RoundOutcome {
    pub fn success() -> Self {
        Self {
            successful: true,
            interrupted: false,
            bad_members: Vec::new(),
            reason: None,
        }
    }

    pub fn interrupted(reason: impl Into<String>) -> Self {
        Self {
            successful: false,
            interrupted: true,
            bad_members: Vec::new(),
            reason: Some(reason.into()),
        }
    }

    pub fn blaming(bad_members: Vec<u32>, reason: impl Into<String>) -> Self {
        Self {
            successful: false,
            interrupted: false,
            bad_members,
            reason: Some(reason.into()),
        }
    }
}
