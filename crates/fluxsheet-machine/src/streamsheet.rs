//! Collaborator contracts of the trigger: the streamsheet that owns it
//! and the sheet whose processing state it steers.
//!
//! The cell model, formula parsing and recalculation order live outside
//! this crate; the trigger only ever talks to these two narrow traits.

use fluxsheet_common::Value;

/// Step counters, owned by the streamsheet and written only by its
/// trigger. `repeatsteps` resets to 0 when processing stops; both are
/// monotonically non-decreasing otherwise.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub steps: u64,
    pub repeatsteps: u64,
}

/// Processing state of a sheet within one step.
///
/// `Ready` before the first step, `Processing` while formulas evaluate,
/// `Paused` when a function suspended the step mid-flight, `Processed`
/// once the step ran to completion.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SheetState {
    #[default]
    Ready,
    Processing,
    Paused,
    Processed,
}

/// The sheet surface the trigger (and the argument pipeline) sees.
///
/// The three mutating methods are the *internal* transitions — the
/// public pause/resume/stop entry points live on the trigger, which
/// cancels its schedule before delegating here.
pub trait Sheet {
    fn is_processing(&self) -> bool;
    fn is_paused(&self) -> bool;
    fn is_processed(&self) -> bool;

    fn stop_processing(&mut self, retval: Option<Value>);
    fn pause_processing(&mut self);
    fn resume_processing(&mut self, retval: Option<Value>);
}

/// A sheet that evaluates repeatedly under control of a trigger.
pub trait Streamsheet {
    /// Evaluate every formula cell once.
    fn trigger_step(&mut self);

    fn stats(&self) -> &Stats;
    fn stats_mut(&mut self) -> &mut Stats;

    fn sheet(&self) -> &dyn Sheet;
    fn sheet_mut(&mut self) -> &mut dyn Sheet;
}
