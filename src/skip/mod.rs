pub mod controller;
pub mod interval_set;
pub mod overrides;
pub mod seek_intent;
pub mod state;
pub mod timers;

pub use controller::SkipController;
pub use interval_set::IntervalSet;
pub use overrides::{OverrideExpiry, OverrideReason, OverrideRegistry, RecheckOutcome};
pub use seek_intent::{SeekIntentTracker, SeekOrigin};
pub use state::{ControllerState, Decision, SkipAction};
pub use timers::{ScheduledTimer, SessionTimers, TimerId, TimerQueue, TimerTask};
