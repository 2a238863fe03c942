use crate::clock::Clock;
use crate::lock::FieldLockManager;
use crate::mode::{failure_notice, in_manual};
use crate::panel::{Notice, PanelState, AUTO_HANDOFF_HINT};
use crate::reconciler::StatusReconciler;
use crate::status::LampColor;
use crate::traits::{ApiResult, ControllerApi};
use log::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LampOutcome {
    /// Nothing was selected, so nothing was sent.
    NoLampSelected,
    /// The switch to manual failed and the color command was never sent.
    HandoffAborted,
    Sent,
    /// The color command went out but failed.
    Failed,
}

/// Open the color picker for a lamp.
pub fn select_lamp(panel: &mut PanelState, lamp_id: u32) {
    panel.selected_lamp = Some(lamp_id);
    panel.overlay_open = true;
    panel.hint = if panel.is_auto() {
        AUTO_HANDOFF_HINT.to_string()
    } else {
        String::new()
    };
}

pub fn close_overlay(panel: &mut PanelState) {
    panel.overlay_open = false;
}

/// The lamp a color pick applies to. Without a selection the operator is
/// told so and the picker closes.
pub fn selection(panel: &mut PanelState) -> Option<u32> {
    if panel.selected_lamp.is_none() {
        panel.notify(Notice::NoLampSelected);
        close_overlay(panel);
    }
    panel.selected_lamp
}

/// Record the answer to a color command.
pub fn settle_lamp(panel: &mut PanelState, lamp_id: u32, result: ApiResult<()>) -> LampOutcome {
    match result {
        Ok(()) => LampOutcome::Sent,
        Err(e) => {
            warn!("Lamp {} command failed: {}", lamp_id, e);
            panel.notify(failure_notice(&e, Notice::LampCommandFailed));
            LampOutcome::Failed
        }
    }
}

/// Force the selected lamp to `color`.
///
/// Leaves auto mode first when needed. Once the color command has been
/// attempted the panel is always refreshed, whatever the result, and the
/// picker closes last.
pub fn set_lamp<A, K>(
    api: &A,
    panel: &mut PanelState,
    reconciler: &mut StatusReconciler,
    locks: &FieldLockManager<K>,
    color: LampColor,
) -> LampOutcome
where
    A: ControllerApi,
    K: Clock,
{
    let Some(lamp_id) = selection(panel) else {
        return LampOutcome::NoLampSelected;
    };

    let sent = in_manual(api, panel, |api, panel| {
        info!("Setting lamp {} to {}", lamp_id, color.code());
        settle_lamp(panel, lamp_id, api.set_lamp(lamp_id, color))
    });

    let outcome = match sent {
        Ok(outcome) => outcome,
        Err(_) => {
            close_overlay(panel);
            return LampOutcome::HandoffAborted;
        }
    };

    reconciler.refresh(api, panel, locks);
    close_overlay(panel);
    outcome
}
