//! Test doubles for the trigger's collaborators.
//!
//! `TestStreamsheet` counts step invocations and can simulate a
//! long-running function pausing the sheet mid-step;
//! `RecordingScheduler` records every schedule/cancel call. Shared by
//! the in-crate trigger tests and downstream pipeline tests.

use fluxsheet_common::Value;

use crate::scheduler::{Scheduler, TriggerId};
use crate::streamsheet::{Sheet, SheetState, Stats, Streamsheet};

#[derive(Debug, Default)]
pub struct TestSheet {
    state: SheetState,
    last_retval: Option<Value>,
    log: Vec<&'static str>,
}

impl TestSheet {
    pub fn set_state(&mut self, state: SheetState) {
        self.state = state;
    }
}

impl Sheet for TestSheet {
    fn is_processing(&self) -> bool {
        self.state == SheetState::Processing
    }

    fn is_paused(&self) -> bool {
        self.state == SheetState::Paused
    }

    fn is_processed(&self) -> bool {
        self.state == SheetState::Processed
    }

    fn stop_processing(&mut self, retval: Option<Value>) {
        self.log.push("stop");
        if retval.is_some() {
            self.last_retval = retval;
        }
        self.state = SheetState::Ready;
    }

    fn pause_processing(&mut self) {
        self.log.push("pause");
        self.state = SheetState::Paused;
    }

    fn resume_processing(&mut self, retval: Option<Value>) {
        self.log.push("resume");
        if self.state == SheetState::Paused {
            self.last_retval = retval;
            self.state = SheetState::Processing;
        }
    }
}

#[derive(Debug, Default)]
pub struct TestStreamsheet {
    stats: Stats,
    sheet: TestSheet,
    /// Number of `trigger_step` invocations so far.
    pub steps_run: u32,
    /// Pause the sheet during the n-th step, as a suspending function
    /// would.
    pub pause_on_step: Option<u32>,
}

impl TestStreamsheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet_log(&self) -> &[&'static str] {
        &self.sheet.log
    }

    pub fn last_retval(&self) -> Option<Value> {
        self.sheet.last_retval.clone()
    }

    pub fn test_sheet_mut(&mut self) -> &mut TestSheet {
        &mut self.sheet
    }
}

impl Streamsheet for TestStreamsheet {
    fn trigger_step(&mut self) {
        self.steps_run += 1;
        self.sheet.state = SheetState::Processing;
        if self.pause_on_step == Some(self.steps_run) {
            self.sheet.pause_processing();
        } else {
            self.sheet.state = SheetState::Processed;
        }
    }

    fn stats(&self) -> &Stats {
        &self.stats
    }

    fn stats_mut(&mut self) -> &mut Stats {
        &mut self.stats
    }

    fn sheet(&self) -> &dyn Sheet {
        &self.sheet
    }

    fn sheet_mut(&mut self) -> &mut dyn Sheet {
        &mut self.sheet
    }
}

#[derive(Debug, Default)]
pub struct RecordingScheduler {
    pub scheduled: Vec<TriggerId>,
    pub cancelled: Vec<TriggerId>,
    pub armed: Option<TriggerId>,
}

impl Scheduler for RecordingScheduler {
    fn schedule(&mut self, id: TriggerId) {
        self.scheduled.push(id);
        self.armed = Some(id);
    }

    fn cancel(&mut self, id: TriggerId) {
        self.cancelled.push(id);
        if self.armed == Some(id) {
            self.armed = None;
        }
    }
}
