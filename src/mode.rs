//! Auto/manual mode switching.
//!
//! Explicit toggles never touch the local mode; the next snapshot confirms it.
//! Commands that only make sense in manual mode go through [`in_manual`], a
//! two-step transaction: switch the controller to manual, then act. If the
//! switch fails the action never runs. The `settle_*` functions apply an
//! answer that was fetched on another thread.

use crate::panel::{Notice, PanelState};
use crate::status::OperatingMode;
use crate::traits::{ApiError, ApiResult, ControllerApi};
use log::{info, warn};

/// Outcome of step one of the manual handoff.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handoff {
    /// Local mode was not auto; nothing was sent.
    NotNeeded,
    /// The controller accepted the switch and local mode is now manual.
    Switched,
}

/// Translate a failed command into the notice the operator sees.
pub(crate) fn failure_notice(err: &ApiError, rejected: impl FnOnce(String) -> Notice) -> Notice {
    match err {
        ApiError::Rejected(text) => rejected(text.clone()),
        ApiError::Transport(_) | ApiError::Malformed(_) => Notice::NetworkError,
    }
}

/// Ask the controller to change mode. Local mode is left for the reconciler.
pub fn request_mode<A: ControllerApi>(
    api: &A,
    panel: &mut PanelState,
    target: OperatingMode,
) -> ApiResult<()> {
    info!("Requesting {} mode", target);
    settle_request(panel, target, api.set_mode(target))
}

/// Record the answer to a mode request. Failures queue a notice.
pub fn settle_request(
    panel: &mut PanelState,
    target: OperatingMode,
    result: ApiResult<()>,
) -> ApiResult<()> {
    result.map_err(|e| {
        warn!("Mode switch to {} failed: {}", target, e);
        panel.notify(failure_notice(&e, |reason| Notice::ModeSwitchFailed {
            target,
            reason,
        }));
        e
    })
}

/// Step one of the handoff: leave auto mode if the panel believes it is in it.
pub fn ensure_manual<A: ControllerApi>(api: &A, panel: &mut PanelState) -> ApiResult<Handoff> {
    if !panel.is_auto() {
        return Ok(Handoff::NotNeeded);
    }
    info!("Requesting {} mode", OperatingMode::Manual);
    settle_handoff(panel, api.set_mode(OperatingMode::Manual))
}

/// Record the answer to step one. Local mode turns manual only once the
/// controller has accepted the switch.
pub fn settle_handoff(panel: &mut PanelState, result: ApiResult<()>) -> ApiResult<Handoff> {
    settle_request(panel, OperatingMode::Manual, result)?;
    panel.mode = Some(OperatingMode::Manual);
    info!("Switched to MANUAL ahead of lamp command");
    Ok(Handoff::Switched)
}

/// Run `act` with the controller in manual mode. Aborts without calling
/// `act` when the switch is refused or cannot be sent.
pub fn in_manual<A, T, F>(api: &A, panel: &mut PanelState, act: F) -> ApiResult<T>
where
    A: ControllerApi,
    F: FnOnce(&A, &mut PanelState) -> T,
{
    ensure_manual(api, panel)?;
    Ok(act(api, panel))
}
