use strum_macros::{AsRefStr, Display};

/// States of the lifecycle state machine
///
/// ```text
/// Idle ──start──▶ Starting ──ok──▶ Running ──stop──▶ Stopping ──▶ Stopped
///                    │                                  ▲
///                    └──err──▶ Failed ──────stop────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
pub enum LifecycleState {
    /// Accepting hooks; nothing has run yet
    Idle,
    /// `start` is running `on_start` actions
    Starting,
    /// Every `on_start` succeeded
    Running,
    /// `stop` is running `on_stop` actions
    Stopping,
    /// `stop` finished; terminal
    Stopped,
    /// `start` halted on a failing or cancelled hook
    Failed,
}

impl LifecycleState {
    /// Whether hooks may still be appended
    pub fn accepts_hooks(self) -> bool {
        self == LifecycleState::Idle
    }

    /// Whether `stop` may run from this state
    pub fn can_stop(self) -> bool {
        matches!(self, LifecycleState::Running | LifecycleState::Failed)
    }
}
