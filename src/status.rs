use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Operating mode of the signal controller.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    Auto,
    Manual,
}

impl OperatingMode {
    /// Value used in the `set=` query parameter.
    pub fn as_query(self) -> &'static str {
        match self {
            OperatingMode::Auto => "auto",
            OperatingMode::Manual => "manual",
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperatingMode::Auto => "AUTO",
            OperatingMode::Manual => "MANUAL",
        })
    }
}

/// Color shown by a single lamp head.
///
/// Wire codes are `R`, `Y`, `G` and `OFF`, matched exactly. Anything else the
/// controller sends, including `null` or a number, is treated as `Off`.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(into = "String")]
pub enum LampColor {
    Red,
    Yellow,
    Green,
    #[default]
    Off,
}

impl LampColor {
    pub fn from_code(code: &str) -> Self {
        match code {
            "R" => LampColor::Red,
            "Y" => LampColor::Yellow,
            "G" => LampColor::Green,
            _ => LampColor::Off,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            LampColor::Red => "R",
            LampColor::Yellow => "Y",
            LampColor::Green => "G",
            LampColor::Off => "OFF",
        }
    }
}

// One bad lamp must not reject the whole snapshot.
impl<'de> Deserialize<'de> for LampColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(code)) => LampColor::from_code(&code),
            _ => LampColor::Off,
        })
    }
}

impl From<LampColor> for String {
    fn from(color: LampColor) -> Self {
        color.code().to_string()
    }
}

/// Sub-state of the automatic two-approach cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    AGreen,
    AYellow,
    BGreen,
    BYellow,
}

impl Phase {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "A_G" => Some(Phase::AGreen),
            "A_Y" => Some(Phase::AYellow),
            "B_G" => Some(Phase::BGreen),
            "B_Y" => Some(Phase::BYellow),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::AGreen => "A Green / B Red",
            Phase::AYellow => "A Yellow / B Red",
            Phase::BGreen => "A Red / B Green",
            Phase::BYellow => "A Red / B Yellow",
        }
    }
}

/// Human label for a wire phase code. Unknown codes are shown verbatim.
pub fn phase_label(code: Option<&str>) -> String {
    match code {
        None | Some("") => "?".to_string(),
        Some(c) => Phase::from_code(c)
            .map(|p| p.label().to_string())
            .unwrap_or_else(|| c.to_string()),
    }
}

/// Timing block of a status payload. Components are seconds and may be absent.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct TimingSnapshot {
    #[serde(rename = "g", default)]
    pub green_s: Option<u32>,
    #[serde(rename = "y", default)]
    pub yellow_s: Option<u32>,
    #[serde(rename = "r", default)]
    pub red_s: Option<u32>,
}

impl TimingSnapshot {
    pub fn new(green_s: u32, yellow_s: u32, red_s: u32) -> Self {
        TimingSnapshot {
            green_s: Some(green_s),
            yellow_s: Some(yellow_s),
            red_s: Some(red_s),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct LampEntry {
    #[serde(rename = "lamp")]
    pub lamp_id: u32,
    #[serde(default)]
    pub color: LampColor,
}

/// One `/status` payload.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ServerStatus {
    pub mode: OperatingMode,

    #[serde(default)]
    pub phase: Option<String>,

    /// Milliseconds left in the current phase. Only meaningful in auto mode.
    #[serde(rename = "t_remain_ms", default)]
    pub remaining_ms: Option<f64>,

    #[serde(default)]
    pub timing: Option<TimingSnapshot>,

    #[serde(default)]
    pub lamps: Vec<LampEntry>,
}

impl ServerStatus {
    /// Remaining time in whole seconds, floored and clamped at zero.
    pub fn remaining_secs(&self) -> u64 {
        match self.remaining_ms {
            Some(ms) if ms.is_finite() && ms > 0.0 => (ms / 1000.0).floor() as u64,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parses_controller_payload() {
        let json = r#"{
            "mode": "auto",
            "phase": "A_G",
            "t_remain_ms": 4321,
            "timing": {"g": 5, "y": 2, "r": 7},
            "lamps": [{"lamp": 1, "color": "G"}, {"lamp": 2, "color": "R"}]
        }"#;
        let status: ServerStatus = serde_json::from_str(json).expect("parse failed");

        assert_eq!(status.mode, OperatingMode::Auto);
        assert_eq!(status.phase.as_deref(), Some("A_G"));
        assert_eq!(status.remaining_secs(), 4);
        assert_eq!(status.timing, Some(TimingSnapshot::new(5, 2, 7)));
        assert_eq!(status.lamps.len(), 2);
        assert_eq!(status.lamps[0].color, LampColor::Green);
    }

    #[test]
    fn test_status_tolerates_nulls_and_missing_fields() {
        let json = r#"{"mode":"manual","phase":null,"t_remain_ms":null,"timing":null}"#;
        let status: ServerStatus = serde_json::from_str(json).expect("parse failed");

        assert_eq!(status.mode, OperatingMode::Manual);
        assert!(status.phase.is_none());
        assert!(status.timing.is_none());
        assert!(status.lamps.is_empty());
        assert_eq!(status.remaining_secs(), 0);
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let json = r#"{"mode":"blinking"}"#;
        assert!(serde_json::from_str::<ServerStatus>(json).is_err());
    }

    #[test]
    fn test_unknown_lamp_color_maps_to_off() {
        let json = r#"{"lamp": 3, "color": "PURPLE"}"#;
        let entry: LampEntry = serde_json::from_str(json).expect("parse failed");
        assert_eq!(entry.color, LampColor::Off);
    }

    #[test]
    fn test_color_codes_are_case_sensitive() {
        assert_eq!(LampColor::from_code("Y"), LampColor::Yellow);
        assert_eq!(LampColor::from_code("OFF"), LampColor::Off);
        assert_eq!(LampColor::from_code("g"), LampColor::Off);
        assert_eq!(LampColor::from_code(" R"), LampColor::Off);
    }

    #[test]
    fn test_non_string_lamp_color_keeps_snapshot() {
        let json = r#"{
            "mode": "auto",
            "phase": "B_G",
            "timing": {"g": 8, "y": 2, "r": 10},
            "lamps": [
                {"lamp": 1, "color": "G"},
                {"lamp": 2, "color": null},
                {"lamp": 3, "color": 2},
                {"lamp": 4}
            ]
        }"#;
        let status: ServerStatus = serde_json::from_str(json).expect("parse failed");

        assert_eq!(status.mode, OperatingMode::Auto);
        assert_eq!(status.timing, Some(TimingSnapshot::new(8, 2, 10)));
        let colors: Vec<_> = status.lamps.iter().map(|l| (l.lamp_id, l.color)).collect();
        assert_eq!(
            colors,
            vec![
                (1, LampColor::Green),
                (2, LampColor::Off),
                (3, LampColor::Off),
                (4, LampColor::Off),
            ]
        );
    }

    #[test]
    fn test_lamp_color_serializes_as_code() {
        let entry = LampEntry { lamp_id: 2, color: LampColor::Yellow };
        assert_eq!(serde_json::to_string(&entry).unwrap(), r#"{"lamp":2,"color":"Y"}"#);
    }

    #[test]
    fn test_remaining_secs_floors_and_clamps() {
        let mut status: ServerStatus = serde_json::from_str(r#"{"mode":"auto"}"#).unwrap();
        status.remaining_ms = Some(1999.0);
        assert_eq!(status.remaining_secs(), 1);
        status.remaining_ms = Some(-500.0);
        assert_eq!(status.remaining_secs(), 0);
        status.remaining_ms = Some(f64::NAN);
        assert_eq!(status.remaining_secs(), 0);
    }

    #[test]
    fn test_phase_labels() {
        assert_eq!(phase_label(Some("A_G")), "A Green / B Red");
        assert_eq!(phase_label(Some("B_Y")), "A Red / B Yellow");
        assert_eq!(phase_label(Some("ALL_RED")), "ALL_RED");
        assert_eq!(phase_label(None), "?");
    }

    #[test]
    fn test_mode_display_and_query() {
        assert_eq!(OperatingMode::Auto.to_string(), "AUTO");
        assert_eq!(OperatingMode::Manual.as_query(), "manual");
    }
}
