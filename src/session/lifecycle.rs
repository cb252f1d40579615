/// What a lifecycle edge asks the timer to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    /// Fold the open session into the total and re-anchor.
    Flush,
    /// Flush, then open a fresh session anchored at now.
    Restart,
}

/// Tracks whether the session is currently visible and maps lifecycle edges
/// to timer actions. Going hidden closes the accounting period early so a
/// later kill loses nothing; coming back opens a fresh one.
pub struct SessionLifecycle {
    visible: bool,
}

impl SessionLifecycle {
    pub fn new(visible: bool) -> Self {
        Self { visible }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Edge-triggered: repeating the current state yields nothing.
    pub fn visibility_changed(&mut self, visible: bool) -> Option<SessionAction> {
        let was_visible = self.visible;
        self.visible = visible;
        match (was_visible, visible) {
            (true, false) => Some(SessionAction::Flush),
            (false, true) => Some(SessionAction::Restart),
            _ => None,
        }
    }

    /// Losing terminal focus checkpoints the counter but keeps it running.
    pub fn focus_lost(&self) -> SessionAction {
        SessionAction::Flush
    }

    pub fn focus_gained(&self) -> SessionAction {
        SessionAction::Restart
    }

    /// Final flush before the process goes away.
    pub fn unload(&self) -> SessionAction {
        SessionAction::Flush
    }
}
