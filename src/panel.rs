use crate::derived::TimingFields;
use crate::status::{LampColor, OperatingMode};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

pub const AUTO_HANDOFF_HINT: &str = "Currently AUTO - will switch to MANUAL when you pick a color.";

/// Alert raised for the operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    NoLampSelected,
    ModeSwitchFailed { target: OperatingMode, reason: String },
    LampCommandFailed(String),
    TimingIncomplete,
    TimingFailed(String),
    NetworkError,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::NoLampSelected => write!(f, "No lamp selected."),
            Notice::ModeSwitchFailed { target, reason } => {
                write!(f, "Could not switch to {}: {}", target, reason)
            }
            Notice::LampCommandFailed(text) => write!(f, "Failed to set lamp: {}", text),
            Notice::TimingIncomplete => write!(f, "Enter both G and Y durations (seconds)."),
            Notice::TimingFailed(text) => write!(f, "Failed to apply timing: {}", text),
            Notice::NetworkError => write!(f, "Network error. Try again."),
        }
    }
}

/// Countdown shown while the controller cycles on its own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AutoDisplay {
    pub phase: String,
    pub remaining_s: u64,
}

/// Everything the panel shows, shared by the reconciler and the command paths.
///
/// `mode` has exactly two writers: the reconciler, with the confirmed value
/// from a snapshot, and the auto-to-manual handoff, with an optimistic value
/// once the controller accepted the switch.
#[derive(Clone, Debug)]
pub struct PanelState {
    /// `None` until the first snapshot arrives.
    pub mode: Option<OperatingMode>,
    pub fields: TimingFields,
    pub auto: Option<AutoDisplay>,
    pub selected_lamp: Option<u32>,
    pub overlay_open: bool,
    pub hint: String,
    lamps: BTreeMap<u32, LampColor>,
    notices: VecDeque<Notice>,
}

impl PanelState {
    pub fn new(lamp_ids: &[u32]) -> Self {
        PanelState {
            mode: None,
            fields: TimingFields::default(),
            auto: None,
            selected_lamp: None,
            overlay_open: false,
            hint: String::new(),
            lamps: lamp_ids.iter().map(|&id| (id, LampColor::Off)).collect(),
            notices: VecDeque::new(),
        }
    }

    pub fn is_auto(&self) -> bool {
        self.mode == Some(OperatingMode::Auto)
    }

    pub fn lamp(&self, lamp_id: u32) -> Option<LampColor> {
        self.lamps.get(&lamp_id).copied()
    }

    pub fn has_lamp(&self, lamp_id: u32) -> bool {
        self.lamps.contains_key(&lamp_id)
    }

    /// Update a lamp's displayed color. Returns false for lamps not on the panel.
    pub fn set_lamp_color(&mut self, lamp_id: u32, color: LampColor) -> bool {
        match self.lamps.get_mut(&lamp_id) {
            Some(slot) => {
                *slot = color;
                true
            }
            None => false,
        }
    }

    pub fn lamps(&self) -> impl Iterator<Item = (u32, LampColor)> + '_ {
        self.lamps.iter().map(|(&id, &color)| (id, color))
    }

    pub fn notify(&mut self, notice: Notice) {
        self.notices.push_back(notice);
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    pub fn pending_notices(&self) -> &VecDeque<Notice> {
        &self.notices
    }
}

impl fmt::Display for PanelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            Some(mode) => writeln!(f, "Mode: {}", mode)?,
            None => writeln!(f, "Mode: ?")?,
        }
        if let Some(auto) = &self.auto {
            writeln!(f, "Phase: {}  Remain: {}s", auto.phase, auto.remaining_s)?;
        }
        writeln!(
            f,
            "Timing: G={} Y={} R={}",
            self.fields.green, self.fields.yellow, self.fields.red
        )?;
        let lamps: Vec<String> = self
            .lamps()
            .map(|(id, color)| format!("{}={}", id, color.code()))
            .collect();
        write!(f, "Lamps: {}", lamps.join(" "))?;
        if self.overlay_open {
            if let Some(id) = self.selected_lamp {
                write!(f, "\nLamp {} selected", id)?;
                if !self.hint.is_empty() {
                    write!(f, " - {}", self.hint)?;
                }
            }
        }
        Ok(())
    }
}
