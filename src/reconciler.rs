//! Folds controller snapshots into the panel.
//!
//! Each poll takes a ticket before the request goes out. Tickets increase
//! monotonically and a response is applied only if its ticket is newer than
//! the last one applied, so a slow poll that returns after a newer one cannot
//! roll the panel back.

use crate::clock::Clock;
use crate::derived;
use crate::lock::{Field, FieldLockManager};
use crate::panel::{AutoDisplay, PanelState};
use crate::status::{phase_label, OperatingMode, ServerStatus};
use crate::traits::{ApiResult, ControllerApi};
use log::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct PollTicket(u64);

impl PollTicket {
    pub fn seq(self) -> u64 {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Merge {
    Applied,
    /// A newer snapshot was already applied; this one was dropped.
    Stale,
}

#[derive(Debug, Default)]
pub struct StatusReconciler {
    issued: u64,
    last_applied: Option<PollTicket>,
}

impl StatusReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_poll(&mut self) -> PollTicket {
        self.issued += 1;
        PollTicket(self.issued)
    }

    pub fn last_applied(&self) -> Option<PollTicket> {
        self.last_applied
    }

    /// Poll the controller and merge the answer. Failures are logged and
    /// swallowed; the next tick retries.
    pub fn refresh<A, K>(
        &mut self,
        api: &A,
        panel: &mut PanelState,
        locks: &FieldLockManager<K>,
    ) -> Option<Merge>
    where
        A: ControllerApi,
        K: Clock,
    {
        let ticket = self.begin_poll();
        self.settle(ticket, api.poll(), panel, locks)
    }

    /// Merge the outcome of a poll started with `ticket`.
    pub fn settle<K: Clock>(
        &mut self,
        ticket: PollTicket,
        result: ApiResult<ServerStatus>,
        panel: &mut PanelState,
        locks: &FieldLockManager<K>,
    ) -> Option<Merge> {
        match result {
            Ok(status) => Some(self.apply(ticket, status, panel, locks)),
            Err(e) => {
                warn!("[poll #{}] Refresh failed: {}", ticket.seq(), e);
                None
            }
        }
    }

    pub fn apply<K: Clock>(
        &mut self,
        ticket: PollTicket,
        status: ServerStatus,
        panel: &mut PanelState,
        locks: &FieldLockManager<K>,
    ) -> Merge {
        if let Some(last) = self.last_applied {
            if ticket <= last {
                debug!(
                    "[poll #{}] Dropping stale snapshot (already applied #{})",
                    ticket.seq(),
                    last.seq()
                );
                return Merge::Stale;
            }
        }
        self.last_applied = Some(ticket);

        if panel.mode != Some(status.mode) {
            debug!("[poll #{}] Mode {:?} -> {}", ticket.seq(), panel.mode, status.mode);
        }
        panel.mode = Some(status.mode);

        if let Some(timing) = status.timing {
            if let Some(g) = timing.green_s {
                if !locks.is_locked(Field::Green) {
                    panel.fields.green = g.to_string();
                }
            }
            if let Some(y) = timing.yellow_s {
                if !locks.is_locked(Field::Yellow) {
                    panel.fields.yellow = y.to_string();
                }
            }

            let red_locked = locks.is_locked(Field::Red);
            if !derived::sync_red(&mut panel.fields, red_locked) && !red_locked {
                if let Some(r) = timing.red_s {
                    panel.fields.red = r.to_string();
                }
            }
        }

        panel.auto = match status.mode {
            OperatingMode::Auto => Some(AutoDisplay {
                phase: phase_label(status.phase.as_deref()),
                remaining_s: status.remaining_secs(),
            }),
            OperatingMode::Manual => None,
        };

        for entry in &status.lamps {
            if !panel.set_lamp_color(entry.lamp_id, entry.color) {
                debug!("[poll #{}] Ignoring lamp {} (not on panel)", ticket.seq(), entry.lamp_id);
            }
        }

        Merge::Applied
    }
}
