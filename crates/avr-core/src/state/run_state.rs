use crate::FaultCode;

/// Host-observable execution state of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunState {
    /// Fetching and executing instructions.
    #[default]
    Running,
    /// Idle sleep; only timers advance until an interrupt is dispatched.
    Sleeping,
    /// A fault is latched and nothing runs until reset.
    Halted(FaultCode),
}

impl RunState {
    /// Returns the latched fault, if this state is halted.
    #[must_use]
    pub const fn latched_fault(self) -> Option<FaultCode> {
        match self {
            Self::Halted(cause) => Some(cause),
            Self::Running | Self::Sleeping => None,
        }
    }

    /// Stable byte tag used by snapshots.
    #[must_use]
    pub const fn to_tag(self) -> (u8, u8) {
        match self {
            Self::Running => (0, 0),
            Self::Sleeping => (1, 0),
            Self::Halted(code) => (2, code.as_u8()),
        }
    }

    /// Inverse of [`RunState::to_tag`].
    #[must_use]
    pub const fn from_tag(tag: u8, code: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Running),
            1 => Some(Self::Sleeping),
            2 => match FaultCode::from_u8(code) {
                Some(code) => Some(Self::Halted(code)),
                None => None,
            },
            _ => None,
        }
    }
}
