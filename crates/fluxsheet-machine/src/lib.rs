pub mod scheduler;
pub mod streamsheet;
pub mod trigger;

pub mod test_streamsheet;

pub use scheduler::{Scheduler, TriggerId};
pub use streamsheet::{Sheet, SheetState, Stats, Streamsheet};
pub use trigger::{ConfigError, Repeat, Trigger, TriggerConfig, TriggerState, TriggerUpdate};
