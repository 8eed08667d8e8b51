//! The per-sheet trigger: decides when and how often a streamsheet
//! evaluates its formulas.
//!
//! A trigger drives its sheet through *cycle steps* (one pass of formula
//! evaluation) and, under an endless repeat policy, *repeat steps* fired
//! by a scheduled task. It also bridges the asynchronous pause/resume
//! handoff: a function that cannot complete within a step parks the
//! sheet in a paused state, and whoever finishes the pending operation
//! calls back through [`Trigger::resume_processing`].

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use fluxsheet_common::Value;

use crate::scheduler::{Scheduler, TriggerId, next_trigger_id};
use crate::streamsheet::{Sheet, Streamsheet};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown repeat mode '{0}'")]
    UnknownRepeat(String),
}

/// Repeat policy: evaluate once per external tick, or keep repeating
/// via the scheduled task until stopped or paused.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Repeat {
    #[default]
    Once,
    Endless,
}

impl FromStr for Repeat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "once" => Ok(Self::Once),
            "endless" => Ok(Self::Endless),
            other => Err(ConfigError::UnknownRepeat(other.to_string())),
        }
    }
}

impl fmt::Display for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Once => "once",
            Self::Endless => "endless",
        })
    }
}

/// Immutable policy input. `kind` is an opaque trigger-kind tag, kept
/// verbatim for persistence; only `repeat` is interpreted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub repeat: Repeat,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            kind: "continuous".to_string(),
            repeat: Repeat::Once,
        }
    }
}

impl TriggerConfig {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            repeat: Repeat::Once,
        }
    }

    pub fn with_repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn is_endless(&self) -> bool {
        self.repeat == Repeat::Endless
    }
}

/// Shallow-merge input for [`Trigger::update`]; present fields win.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TriggerUpdate {
    pub kind: Option<String>,
    pub repeat: Option<Repeat>,
}

/// Canonical trigger state.
///
/// The stopped flag and the armed repeat task are independent axes: an
/// external tick may re-trigger a stopped sheet, arming a schedule while
/// the stop flag is still set (it is cleared by the next machine-level
/// resume). Enumerating all four combinations keeps every transition
/// explicit; the `is_*` predicates on [`Trigger`] are views over this.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    #[default]
    Idle,
    /// A repeat task is armed.
    Repeating,
    /// Processing stopped, nothing armed.
    Stopped,
    /// Processing stopped while a new repeat cycle is already armed.
    StoppedRepeating,
}

impl TriggerState {
    fn armed(self) -> Self {
        match self {
            Self::Idle | Self::Repeating => Self::Repeating,
            Self::Stopped | Self::StoppedRepeating => Self::StoppedRepeating,
        }
    }

    fn disarmed(self) -> Self {
        match self {
            Self::Idle | Self::Repeating => Self::Idle,
            Self::Stopped | Self::StoppedRepeating => Self::Stopped,
        }
    }

    fn cleared_stop(self) -> Self {
        match self {
            Self::Stopped => Self::Idle,
            Self::StoppedRepeating => Self::Repeating,
            other => other,
        }
    }

    pub fn is_stopped(self) -> bool {
        matches!(self, Self::Stopped | Self::StoppedRepeating)
    }

    pub fn is_armed(self) -> bool {
        matches!(self, Self::Repeating | Self::StoppedRepeating)
    }
}

/// The trigger state machine. Owned by its streamsheet for the attached
/// lifetime; the back-reference is weak, the streamsheet owns the
/// trigger and not vice versa.
pub struct Trigger {
    id: TriggerId,
    config: TriggerConfig,
    state: TriggerState,
    is_resumed: bool,
    is_manual_step: bool,
    streamsheet: Option<Weak<RefCell<dyn Streamsheet>>>,
    scheduler: Rc<RefCell<dyn Scheduler>>,
}

impl Trigger {
    pub fn new(config: TriggerConfig, scheduler: Rc<RefCell<dyn Scheduler>>) -> Self {
        Self {
            id: next_trigger_id(),
            config,
            state: TriggerState::Idle,
            is_resumed: false,
            is_manual_step: false,
            streamsheet: None,
            scheduler,
        }
    }

    pub fn id(&self) -> TriggerId {
        self.id
    }

    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    pub fn kind(&self) -> &str {
        &self.config.kind
    }

    pub fn is_endless(&self) -> bool {
        self.config.is_endless()
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    pub fn is_stopped(&self) -> bool {
        self.state.is_stopped()
    }

    pub fn is_repeat_scheduled(&self) -> bool {
        self.state.is_armed()
    }

    pub fn is_attached(&self) -> bool {
        self.streamsheet.is_some()
    }

    /// The persisted shape stored alongside the sheet definition: a
    /// shallow copy of `{type, repeat}`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or(serde_json::Value::Null)
    }

    /// Bind the owning streamsheet. No side effects beyond the
    /// reference assignment.
    pub fn attach(&mut self, streamsheet: Weak<RefCell<dyn Streamsheet>>) {
        self.streamsheet = Some(streamsheet);
    }

    /// Shallow-merge a partial config; present fields win.
    pub fn update(&mut self, update: TriggerUpdate) {
        if let Some(kind) = update.kind {
            self.config.kind = kind;
        }
        if let Some(repeat) = update.repeat {
            self.config.repeat = repeat;
        }
    }

    /// Machine-start hook. Stats are deliberately not reset here.
    pub fn start(&mut self) {}

    /// Machine-pause hook. Schedule cancellation happens via
    /// [`Trigger::pause_processing`].
    pub fn pause(&mut self) {}

    /// Machine-level resume, i.e. the whole machine goes from pause
    /// back to start. Not to be confused with the function-level
    /// [`Trigger::resume_processing`].
    pub fn resume(&mut self) {
        if !self.state.is_stopped() && !self.sheet_is_paused() {
            if self.is_endless() {
                self.finish_repeat_step();
            } else {
                self.finish_step();
            }
        }
        self.state = self.state.cleared_stop();
    }

    /// The step-request entry point, called once per external tick or
    /// manual step request. A no-op while a resume is in flight or a
    /// repeat task is already armed.
    pub fn trigger(&mut self) {
        if self.is_resumed || self.state.is_armed() {
            return;
        }
        // do not start repetition again if paused by a function
        if !self.is_manual_step && self.is_endless() && !self.sheet_is_paused() {
            self.start_repeat();
        } else {
            self.do_cycle_step();
        }
    }

    /// One tick of the armed repeat task, delivered by the scheduler
    /// driver.
    pub fn repeat_step(&mut self) {
        // re-arm first, the step itself may cancel the schedule
        self.arm_schedule();
        self.do_repeat_step();
    }

    pub fn pre_step(&mut self, manual: bool) {
        self.is_resumed = false;
        self.is_manual_step = manual;
    }

    pub fn post_step(&mut self, _manual: bool) {
        self.is_manual_step = false;
    }

    pub fn stop(&mut self) {
        self.stop_processing(None);
    }

    /// Cancel any armed repeat task, reset the repeat counter and stop
    /// sheet processing with `retval`.
    pub fn stop_processing(&mut self, retval: Option<Value>) {
        self.clear_schedule();
        self.state = TriggerState::Stopped;
        debug!(trigger = self.id, "stop processing");
        if let Some(ss) = self.upgrade() {
            let mut ss = ss.borrow_mut();
            ss.stats_mut().repeatsteps = 0;
            ss.sheet_mut().stop_processing(retval);
        }
    }

    /// Park the sheet in a paused state, cancelling the armed repeat
    /// task first so a late tick cannot step a paused sheet.
    pub fn pause_processing(&mut self) {
        self.clear_schedule();
        debug!(trigger = self.id, "pause processing");
        if let Some(ss) = self.upgrade() {
            ss.borrow_mut().sheet_mut().pause_processing();
        }
    }

    /// Complete a step that a function suspended: only effective while
    /// the sheet is paused. The external actor holding the pending
    /// result calls this with the function's return value.
    pub fn resume_processing(&mut self, retval: Option<Value>) {
        if !self.sheet_is_paused() {
            return;
        }
        self.is_resumed = true;
        debug!(trigger = self.id, "resume processing");
        if let Some(ss) = self.upgrade() {
            ss.borrow_mut().sheet_mut().resume_processing(retval);
        }
        if !self.is_manual_step && self.is_endless() {
            self.finish_repeat_step();
        } else {
            self.finish_step();
        }
    }

    /// Teardown, called by the streamsheet when it is removed. A
    /// pending pause is unwound first: stopping before resuming would
    /// leave the sheet paused with no schedule left to resume it.
    pub fn dispose(&mut self) {
        if self.sheet_is_paused() {
            self.resume_processing(None);
        }
        self.stop_processing(None);
        self.streamsheet = None;
        debug!(trigger = self.id, "disposed");
    }

    fn start_repeat(&mut self) {
        self.arm_schedule();
        if let Some(ss) = self.upgrade() {
            ss.borrow_mut().stats_mut().steps += 1;
        }
        // on repeat start we do a normal cycle step
        self.do_cycle_step();
    }

    fn do_cycle_step(&mut self) {
        let Some(ss) = self.upgrade() else {
            return;
        };
        let paused_after = {
            let mut ss = ss.borrow_mut();
            // manual steps of a repeating sheet land here too
            if !ss.sheet().is_paused() {
                if self.is_endless() {
                    ss.stats_mut().repeatsteps += 1;
                    if self.is_manual_step {
                        ss.stats_mut().steps += 1;
                    }
                } else {
                    ss.stats_mut().steps += 1;
                }
            }
            ss.trigger_step();
            ss.sheet().is_paused()
        };
        // a function paused the sheet mid-step: drop the armed schedule
        if paused_after {
            self.clear_schedule();
        }
    }

    fn do_repeat_step(&mut self) {
        let Some(ss) = self.upgrade() else {
            return;
        };
        let paused_after = {
            let mut ss = ss.borrow_mut();
            ss.stats_mut().repeatsteps += 1;
            ss.trigger_step();
            ss.sheet().is_paused()
        };
        if paused_after {
            self.clear_schedule();
        }
    }

    fn finish_step(&mut self) {
        let Some(ss) = self.upgrade() else {
            return;
        };
        let mut ss = ss.borrow_mut();
        if !ss.sheet().is_processed() {
            ss.trigger_step();
        }
    }

    fn finish_repeat_step(&mut self) {
        self.finish_step();
        if !self.sheet_is_paused() {
            self.arm_schedule();
        }
    }

    fn arm_schedule(&mut self) {
        debug!(trigger = self.id, "arm repeat schedule");
        self.scheduler.borrow_mut().schedule(self.id);
        self.state = self.state.armed();
    }

    fn clear_schedule(&mut self) {
        self.scheduler.borrow_mut().cancel(self.id);
        self.state = self.state.disarmed();
    }

    fn upgrade(&self) -> Option<Rc<RefCell<dyn Streamsheet>>> {
        self.streamsheet.as_ref()?.upgrade()
    }

    fn sheet_is_paused(&self) -> bool {
        self.upgrade()
            .map(|ss| ss.borrow().sheet().is_paused())
            .unwrap_or(false)
    }

    #[cfg(test)]
    fn set_resumed(&mut self, resumed: bool) {
        self.is_resumed = resumed;
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trigger")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("state", &self.state)
            .field("is_resumed", &self.is_resumed)
            .field("is_manual_step", &self.is_manual_step)
            .field("attached", &self.streamsheet.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_streamsheet::{RecordingScheduler, TestStreamsheet};

    fn setup(
        repeat: Repeat,
    ) -> (
        Trigger,
        Rc<RefCell<TestStreamsheet>>,
        Rc<RefCell<RecordingScheduler>>,
    ) {
        let scheduler = Rc::new(RefCell::new(RecordingScheduler::default()));
        let streamsheet = Rc::new(RefCell::new(TestStreamsheet::new()));
        let mut trigger = Trigger::new(
            TriggerConfig::new("continuous").with_repeat(repeat),
            scheduler.clone(),
        );
        let as_dyn: Rc<RefCell<dyn Streamsheet>> = streamsheet.clone();
        trigger.attach(Rc::downgrade(&as_dyn));
        (trigger, streamsheet, scheduler)
    }

    #[test]
    fn once_policy_steps_exactly_once() {
        let (mut trigger, ss, scheduler) = setup(Repeat::Once);
        trigger.pre_step(false);
        trigger.trigger();
        trigger.post_step(false);
        assert_eq!(ss.borrow().stats().steps, 1);
        assert_eq!(ss.borrow().stats().repeatsteps, 0);
        assert_eq!(ss.borrow().steps_run, 1);
        assert!(scheduler.borrow().scheduled.is_empty());
    }

    #[test]
    fn trigger_is_noop_while_resume_in_flight() {
        let (mut trigger, ss, _) = setup(Repeat::Once);
        trigger.set_resumed(true);
        trigger.trigger();
        assert_eq!(ss.borrow().stats().steps, 0);
        assert_eq!(ss.borrow().steps_run, 0);
    }

    #[test]
    fn endless_trigger_arms_one_schedule() {
        let (mut trigger, ss, scheduler) = setup(Repeat::Endless);
        trigger.pre_step(false);
        trigger.trigger();
        assert_eq!(scheduler.borrow().scheduled.len(), 1);
        assert_eq!(scheduler.borrow().armed, Some(trigger.id()));
        assert_eq!(ss.borrow().stats().steps, 1);
        assert_eq!(ss.borrow().stats().repeatsteps, 1);
        assert_eq!(ss.borrow().steps_run, 1);
        assert!(trigger.is_repeat_scheduled());

        // already armed: a second tick must not double-step
        trigger.trigger();
        assert_eq!(scheduler.borrow().scheduled.len(), 1);
        assert_eq!(ss.borrow().steps_run, 1);
    }

    #[test]
    fn manual_step_of_endless_sheet_counts_both() {
        let (mut trigger, ss, scheduler) = setup(Repeat::Endless);
        trigger.pre_step(true);
        trigger.trigger();
        trigger.post_step(true);
        assert!(scheduler.borrow().scheduled.is_empty());
        assert_eq!(ss.borrow().stats().steps, 1);
        assert_eq!(ss.borrow().stats().repeatsteps, 1);
        assert_eq!(ss.borrow().steps_run, 1);
    }

    #[test]
    fn repeat_step_rearms_and_counts() {
        let (mut trigger, ss, scheduler) = setup(Repeat::Endless);
        trigger.trigger();
        trigger.repeat_step();
        assert_eq!(scheduler.borrow().scheduled.len(), 2);
        assert_eq!(ss.borrow().stats().steps, 1);
        assert_eq!(ss.borrow().stats().repeatsteps, 2);
        assert_eq!(ss.borrow().steps_run, 2);
    }

    #[test]
    fn stop_resets_repeatsteps_but_keeps_steps() {
        let (mut trigger, ss, scheduler) = setup(Repeat::Endless);
        trigger.trigger();
        trigger.stop_processing(None);
        assert!(trigger.is_stopped());
        assert_eq!(ss.borrow().stats().steps, 1);
        assert_eq!(ss.borrow().stats().repeatsteps, 0);
        assert_eq!(scheduler.borrow().armed, None);
        assert_eq!(ss.borrow().sheet_log(), &["stop"]);
    }

    #[test]
    fn midstep_pause_cancels_armed_schedule() {
        let (mut trigger, ss, scheduler) = setup(Repeat::Endless);
        ss.borrow_mut().pause_on_step = Some(1);
        trigger.trigger();
        assert!(ss.borrow().sheet().is_paused());
        assert_eq!(scheduler.borrow().armed, None);
        assert!(scheduler.borrow().cancelled.contains(&trigger.id()));
        assert!(!trigger.is_repeat_scheduled());
    }

    #[test]
    fn resume_processing_finishes_suspended_step() {
        let (mut trigger, ss, scheduler) = setup(Repeat::Endless);
        ss.borrow_mut().pause_on_step = Some(1);
        trigger.pre_step(false);
        trigger.trigger();
        assert!(ss.borrow().sheet().is_paused());

        trigger.resume_processing(Some(Value::Int(42)));
        assert!(!ss.borrow().sheet().is_paused());
        assert_eq!(ss.borrow().last_retval(), Some(Value::Int(42)));
        // the suspended step finished and the repeat schedule is armed again
        assert_eq!(ss.borrow().steps_run, 2);
        assert_eq!(scheduler.borrow().armed, Some(trigger.id()));

        // resume already in flight: an external tick must not re-step
        trigger.trigger();
        assert_eq!(ss.borrow().steps_run, 2);
    }

    #[test]
    fn resume_processing_without_pause_is_noop() {
        let (mut trigger, ss, _) = setup(Repeat::Once);
        trigger.resume_processing(None);
        assert_eq!(ss.borrow().steps_run, 0);
        assert_eq!(ss.borrow().sheet_log().len(), 0);
    }

    #[test]
    fn dispose_while_paused_resumes_before_stopping() {
        let (mut trigger, ss, scheduler) = setup(Repeat::Endless);
        ss.borrow_mut().pause_on_step = Some(1);
        trigger.trigger();
        assert!(ss.borrow().sheet().is_paused());

        trigger.dispose();
        assert_eq!(ss.borrow().sheet_log(), &["pause", "resume", "stop"]);
        assert!(trigger.is_stopped());
        assert!(!trigger.is_attached());
        assert_eq!(scheduler.borrow().armed, None);
        assert_eq!(ss.borrow().stats().repeatsteps, 0);
    }

    #[test]
    fn machine_resume_finishes_unprocessed_step() {
        let (mut trigger, ss, _) = setup(Repeat::Once);
        // sheet never processed yet, trigger not stopped
        trigger.resume();
        assert_eq!(ss.borrow().steps_run, 1);
    }

    #[test]
    fn machine_resume_clears_stop_flag() {
        let (mut trigger, ss, _) = setup(Repeat::Once);
        trigger.stop();
        assert!(trigger.is_stopped());
        let runs = ss.borrow().steps_run;
        trigger.resume();
        assert!(!trigger.is_stopped());
        // stopped triggers do not finish a step on resume
        assert_eq!(ss.borrow().steps_run, runs);
    }

    #[test]
    fn update_merges_partial_config() {
        let (mut trigger, _, _) = setup(Repeat::Once);
        trigger.update(TriggerUpdate {
            repeat: Some(Repeat::Endless),
            ..Default::default()
        });
        assert!(trigger.is_endless());
        assert_eq!(trigger.kind(), "continuous");
    }

    #[test]
    fn to_json_is_the_persisted_shape() {
        let (trigger, _, _) = setup(Repeat::Endless);
        assert_eq!(
            trigger.to_json(),
            serde_json::json!({"type": "continuous", "repeat": "endless"})
        );
    }

    #[test]
    fn repeat_parses_and_rejects() {
        assert_eq!("once".parse::<Repeat>(), Ok(Repeat::Once));
        assert_eq!("endless".parse::<Repeat>(), Ok(Repeat::Endless));
        assert_eq!(
            "forever".parse::<Repeat>(),
            Err(ConfigError::UnknownRepeat("forever".to_string()))
        );
    }
}
