use serde::{Deserialize, Serialize};

use crate::models::{IntervalKey, SkipInterval};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ControllerState {
    #[default]
    Disabled,
    /// Intervals loaded and media present; every tick is evaluated.
    Armed,
    /// Only observable while a jump is being applied.
    Skipping,
}

/// Result of evaluating one clock tick, in the order the checks run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Disabled,
    ManualSeekInProgress,
    NoInterval,
    Overridden(IntervalKey),
    GracePeriod(IntervalKey),
    Skip(SkipInterval),
}

impl Decision {
    pub fn should_skip(&self) -> bool {
        matches!(self, Decision::Skip(_))
    }
}

/// A jump the controller wants applied to the media clock.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SkipAction {
    pub interval: SkipInterval,
    pub from: f64,
    pub to: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skip::SkipController;

    #[test]
    fn new_controller_starts_disabled() {
        assert_eq!(ControllerState::default(), ControllerState::Disabled);
        assert_eq!(SkipController::new().state(), ControllerState::Disabled);
        assert_eq!(
            serde_json::to_string(&ControllerState::default()).unwrap(),
            "\"disabled\""
        );
    }
}
