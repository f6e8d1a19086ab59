use nmeshed_base::{invalid_transition_err, Error};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EngineState {
    Idle,
    Booting,
    Active,
    Stopping,
    Stopped,
    Destroyed,
}

impl EngineState {
    /// Whether `self -> next` is an allowed transition. `Destroyed` is
    /// terminal: no transition out of it is ever allowed, including to
    /// itself (destroy() is idempotent at the call-site level, not here).
    fn can_transition_to(self, next: EngineState) -> bool {
        use EngineState::*;
        match (self, next) {
            (Destroyed, _) => false,
            (_, Destroyed) => true,
            (Idle, Booting) => true,
            (Booting, Active) => true,
            (Active, Stopping) => true,
            (Stopping, Stopped) => true,
            (Stopped, Booting) => true,
            _ => false,
        }
    }

    pub fn transition(self, next: EngineState) -> Result<EngineState, Error> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(invalid_transition_err(format!(
                "illegal engine state transition {self:?} -> {next:?}"
            )))
        }
    }
}
