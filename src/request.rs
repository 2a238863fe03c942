//! Controller calls as plain values.
//!
//! A [`Request`] names one call to the signal controller. Executing it needs
//! only the API handle, so it can run on any thread; the [`Reply`] it yields
//! is handed back to the thread that owns the panel and applied there.

use crate::reconciler::PollTicket;
use crate::status::{LampColor, OperatingMode, ServerStatus};
use crate::traits::{ApiResult, ControllerApi};
use log::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Request {
    Poll(PollTicket),
    /// Step one of a lamp pick made while the panel shows auto: switch the
    /// controller to manual. The lamp and color ride along for step two.
    Handoff { lamp_id: u32, color: LampColor },
    SetLamp { lamp_id: u32, color: LampColor },
    SetMode(OperatingMode),
    SetTiming { green_s: u32, yellow_s: u32 },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    Polled(PollTicket, ApiResult<ServerStatus>),
    HandedOff {
        lamp_id: u32,
        color: LampColor,
        result: ApiResult<()>,
    },
    LampSet {
        lamp_id: u32,
        color: LampColor,
        result: ApiResult<()>,
    },
    ModeSet {
        target: OperatingMode,
        result: ApiResult<()>,
    },
    TimingSet {
        green_s: u32,
        yellow_s: u32,
        result: ApiResult<()>,
    },
}

impl Request {
    /// Perform the call. Blocks for as long as the controller takes.
    pub fn execute<A: ControllerApi + ?Sized>(&self, api: &A) -> Reply {
        debug!("Executing {:?}", self);
        match *self {
            Request::Poll(ticket) => Reply::Polled(ticket, api.poll()),
            Request::Handoff { lamp_id, color } => Reply::HandedOff {
                lamp_id,
                color,
                result: api.set_mode(OperatingMode::Manual),
            },
            Request::SetLamp { lamp_id, color } => Reply::LampSet {
                lamp_id,
                color,
                result: api.set_lamp(lamp_id, color),
            },
            Request::SetMode(target) => Reply::ModeSet {
                target,
                result: api.set_mode(target),
            },
            Request::SetTiming { green_s, yellow_s } => Reply::TimingSet {
                green_s,
                yellow_s,
                result: api.set_timing(green_s, yellow_s),
            },
        }
    }
}
