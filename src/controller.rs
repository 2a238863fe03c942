//! Panel Controller - ties the control panel together
//!
//! Owns the shared panel state, the edit locks, the poll sequencing and the
//! controller connection. Two sources drive it:
//! 1. **Timer ticks**: one status refresh per poll interval
//! 2. **Operator events**: field interaction, lamp picks, mode and timing
//!    commands, each of which refreshes the panel once it completes
//!
//! Network work is split in two halves. [`PanelController::begin`] applies
//! the local part of an event and returns the [`Request`]s it needs, and
//! [`PanelController::complete`] applies a [`Reply`] and returns any
//! follow-up requests. The caller decides where requests run: the binary
//! hands them to worker threads, [`PanelController::handle`] runs them in
//! place. Either way the state is only ever touched from the owning thread.

use crate::clock::Clock;
use crate::config::PanelConfig;
use crate::derived::{self, clamp_seconds};
use crate::dispatcher::{self, LampOutcome};
use crate::lock::{Field, FieldLockManager};
use crate::mode::{self, failure_notice};
use crate::panel::{Notice, PanelState};
use crate::reconciler::{Merge, StatusReconciler};
use crate::request::{Reply, Request};
use crate::status::{LampColor, OperatingMode};
use crate::traits::{ApiResult, ControllerApi};
use log::{debug, info, warn};
use std::collections::VecDeque;

/// Operator interaction delivered to the panel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserEvent {
    Focus(Field),
    Blur(Field),
    PointerDown(Field),
    KeyDown(Field),
    Input(Field, String),
    SelectLamp(u32),
    CloseOverlay,
    SetColor(LampColor),
    RequestMode(OperatingMode),
    ApplyTiming,
    Refresh,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimingOutcome {
    /// Green or yellow did not parse; nothing was sent.
    Incomplete,
    Sent { green_s: u32, yellow_s: u32 },
    Failed,
}

pub struct PanelController<A, K>
where
    A: ControllerApi,
    K: Clock,
{
    api: A,
    locks: FieldLockManager<K>,
    reconciler: StatusReconciler,
    panel: PanelState,
}

impl<A, K> PanelController<A, K>
where
    A: ControllerApi,
    K: Clock,
{
    pub fn new(api: A, clock: K, config: &PanelConfig) -> Self {
        info!(
            "Panel: {} lamps, poll every {}ms, edit grace {}ms",
            config.lamps.len(),
            config.timing.poll_interval_ms,
            config.timing.edit_grace_ms
        );
        PanelController {
            api,
            locks: FieldLockManager::new(clock, config.timing.edit_grace_ms),
            reconciler: StatusReconciler::new(),
            panel: PanelState::new(&config.lamps),
        }
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn panel(&self) -> &PanelState {
        &self.panel
    }

    pub fn locks(&self) -> &FieldLockManager<K> {
        &self.locks
    }

    pub fn reconciler(&self) -> &StatusReconciler {
        &self.reconciler
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.panel.drain_notices()
    }

    pub fn log_status(&self) {
        for line in self.panel.to_string().lines() {
            info!("{}", line);
        }
    }

    // ========================================================================
    // SPLIT-PHASE DRIVERS
    // ========================================================================

    /// Start a status poll. The ticket is taken now, so a reply that
    /// arrives after a newer one is dropped.
    pub fn begin_poll(&mut self) -> Request {
        Request::Poll(self.reconciler.begin_poll())
    }

    /// Apply the local half of `event` and return the controller calls it
    /// needs. Nothing here waits on the network.
    pub fn begin(&mut self, event: UserEvent) -> Vec<Request> {
        debug!("Event: {:?}", event);
        match event {
            UserEvent::Focus(field) | UserEvent::PointerDown(field) => self.locks.mark(field, true),
            UserEvent::Blur(field) => self.locks.mark(field, false),
            UserEvent::KeyDown(field) => self.locks.touch(field),
            UserEvent::Input(field, text) => self.input(field, text),
            UserEvent::SelectLamp(lamp_id) => self.select_lamp(lamp_id),
            UserEvent::CloseOverlay => dispatcher::close_overlay(&mut self.panel),
            UserEvent::SetColor(color) => return self.begin_set_lamp(color).into_iter().collect(),
            UserEvent::RequestMode(target) => {
                info!("Requesting {} mode", target);
                return vec![Request::SetMode(target)];
            }
            UserEvent::ApplyTiming => {
                return match self.timing_request() {
                    Some((green_s, yellow_s)) => vec![Request::SetTiming { green_s, yellow_s }],
                    None => vec![self.begin_poll()],
                };
            }
            UserEvent::Refresh => return vec![self.begin_poll()],
        }
        Vec::new()
    }

    fn begin_set_lamp(&mut self, color: LampColor) -> Option<Request> {
        let lamp_id = dispatcher::selection(&mut self.panel)?;
        if self.panel.is_auto() {
            info!("Requesting {} mode", OperatingMode::Manual);
            Some(Request::Handoff { lamp_id, color })
        } else {
            info!("Setting lamp {} to {}", lamp_id, color.code());
            Some(Request::SetLamp { lamp_id, color })
        }
    }

    /// Apply the answer to an earlier request and return what comes next.
    pub fn complete(&mut self, reply: Reply) -> Vec<Request> {
        match reply {
            Reply::Polled(ticket, result) => {
                self.reconciler
                    .settle(ticket, result, &mut self.panel, &self.locks);
                Vec::new()
            }
            Reply::HandedOff { lamp_id, color, result } => {
                match mode::settle_handoff(&mut self.panel, result) {
                    Ok(_) => {
                        info!("Setting lamp {} to {}", lamp_id, color.code());
                        vec![Request::SetLamp { lamp_id, color }]
                    }
                    Err(_) => {
                        dispatcher::close_overlay(&mut self.panel);
                        Vec::new()
                    }
                }
            }
            Reply::LampSet { lamp_id, result, .. } => {
                dispatcher::settle_lamp(&mut self.panel, lamp_id, result);
                dispatcher::close_overlay(&mut self.panel);
                vec![self.begin_poll()]
            }
            Reply::ModeSet { target, result } => {
                let _ = mode::settle_request(&mut self.panel, target, result);
                vec![self.begin_poll()]
            }
            Reply::TimingSet { green_s, yellow_s, result } => {
                self.settle_timing(green_s, yellow_s, result);
                vec![self.begin_poll()]
            }
        }
    }

    // ========================================================================
    // INLINE DRIVERS
    // ========================================================================

    /// Handle `event`, running any controller calls on this thread until the
    /// operation has finished.
    pub fn handle(&mut self, event: UserEvent) {
        let requests = self.begin(event);
        self.run_inline(requests);
    }

    fn run_inline(&mut self, requests: Vec<Request>) {
        let mut queue: VecDeque<Request> = requests.into();
        while let Some(request) = queue.pop_front() {
            let reply = request.execute(&self.api);
            queue.extend(self.complete(reply));
        }
    }

    /// One timer tick: poll and merge.
    pub fn tick(&mut self) -> Option<Merge> {
        self.refresh()
    }

    pub fn refresh(&mut self) -> Option<Merge> {
        self.reconciler.refresh(&self.api, &mut self.panel, &self.locks)
    }

    // ========================================================================
    // FIELD EDITING
    // ========================================================================

    /// New text in a timing field. Green/yellow push into red, red pulls
    /// green back out.
    pub fn input(&mut self, field: Field, text: String) {
        self.locks.touch(field);
        self.panel.fields.set(field, text);

        let red_locked = self.locks.is_locked(Field::Red);
        match field {
            Field::Green | Field::Yellow => {
                derived::sync_red(&mut self.panel.fields, red_locked);
            }
            Field::Red => {
                derived::red_edited(&mut self.panel.fields, red_locked);
            }
        }
    }

    /// Send the edited green/yellow durations, clamped to the accepted range.
    pub fn commit_timing(&mut self) -> TimingOutcome {
        let outcome = match self.timing_request() {
            Some((green_s, yellow_s)) => {
                let result = self.api.set_timing(green_s, yellow_s);
                self.settle_timing(green_s, yellow_s, result)
            }
            None => TimingOutcome::Incomplete,
        };
        self.refresh();
        outcome
    }

    /// Clamped green/yellow to send, or `None` (with a notice) when either
    /// field does not parse.
    fn timing_request(&mut self) -> Option<(u32, u32)> {
        let fields = &self.panel.fields;
        let (Some(green), Some(yellow)) = (fields.seconds(Field::Green), fields.seconds(Field::Yellow))
        else {
            self.panel.notify(Notice::TimingIncomplete);
            return None;
        };
        let (green_s, yellow_s) = (clamp_seconds(green), clamp_seconds(yellow));
        info!("Applying timing G={}s Y={}s", green_s, yellow_s);
        Some((green_s, yellow_s))
    }

    fn settle_timing(&mut self, green_s: u32, yellow_s: u32, result: ApiResult<()>) -> TimingOutcome {
        match result {
            Ok(()) => {
                self.locks.release_all();
                TimingOutcome::Sent { green_s, yellow_s }
            }
            Err(e) => {
                warn!("Timing update failed: {}", e);
                self.panel.notify(failure_notice(&e, Notice::TimingFailed));
                TimingOutcome::Failed
            }
        }
    }

    // ========================================================================
    // COMMANDS
    // ========================================================================

    pub fn select_lamp(&mut self, lamp_id: u32) {
        if !self.panel.has_lamp(lamp_id) {
            warn!("Lamp {} is not on this panel", lamp_id);
        }
        dispatcher::select_lamp(&mut self.panel, lamp_id);
    }

    pub fn set_lamp(&mut self, color: LampColor) -> LampOutcome {
        dispatcher::set_lamp(
            &self.api,
            &mut self.panel,
            &mut self.reconciler,
            &self.locks,
            color,
        )
    }

    /// Explicit toggle. Local mode only changes when a snapshot confirms it.
    pub fn request_mode(&mut self, target: OperatingMode) {
        let _ = mode::request_mode(&self.api, &mut self.panel, target);
        self.refresh();
    }
}
