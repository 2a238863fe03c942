//! Authenticated JSON packets for the ESP32 signal controller's serial link.
//!
//! A packet is `{id_src, id_des, opcode, time, data, auth}` in that key order,
//! serialized without whitespace. `auth` is the hex MD5 of
//! `"{id_src}{id_des}{opcode}{data}{time}{key}"`, with `data` in the same
//! compact form (`null` when absent). The controller signs its responses with
//! the request's ids, opcode and data but its own `time`.

use crate::status::OperatingMode;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

pub const DEFAULT_KEY: &str = "my_secret_key";
pub const DEFAULT_ID_SRC: i64 = 1;
pub const DEFAULT_ID_DES: i64 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    #[error("opcode must be 1..5 (got {0})")]
    InvalidOpcode(u8),
    #[error("opcode {opcode} requires {needs}")]
    MissingArgument { opcode: u8, needs: &'static str },
    #[error("bad pair '{0}', expected lamp:color")]
    BadPair(String),
    #[error("JSON parse error: {0}")]
    Json(String),
    #[error("bad {which} JSON fields: {field}")]
    BadField { which: &'static str, field: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LampCommand {
    pub lamp: i64,
    pub color: String,
}

impl LampCommand {
    /// Parse `lamp:color`, e.g. `3:g`. Colors are upper-cased, not validated.
    pub fn parse_pair(pair: &str) -> Result<Self, PacketError> {
        let bad = || PacketError::BadPair(pair.to_string());
        let (lamp, color) = pair.split_once(':').ok_or_else(bad)?;
        let lamp = lamp.trim().parse().map_err(|_| bad())?;
        Ok(LampCommand {
            lamp,
            color: color.to_uppercase(),
        })
    }
}

/// Payload of a request packet, one variant per opcode family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Opcode 1.
    SetLamp(LampCommand),
    /// Opcode 2.
    SetLamps(Vec<LampCommand>),
    /// Opcodes 3 and 4 carry an empty object.
    Bare(u8),
    /// Opcode 5.
    SetMode(OperatingMode),
}

impl Command {
    /// Assemble a command from loose CLI-style arguments.
    pub fn from_args(
        opcode: u8,
        lamp: Option<i64>,
        color: Option<&str>,
        pairs: &[String],
        set: Option<OperatingMode>,
    ) -> Result<Self, PacketError> {
        match opcode {
            1 => match (lamp, color) {
                (Some(lamp), Some(color)) => Ok(Command::SetLamp(LampCommand {
                    lamp,
                    color: color.to_uppercase(),
                })),
                _ => Err(PacketError::MissingArgument {
                    opcode,
                    needs: "--lamp and --color (R|Y|G)",
                }),
            },
            2 => {
                if pairs.is_empty() {
                    return Err(PacketError::MissingArgument {
                        opcode,
                        needs: "--pairs like: 1:R 2:Y 3:G",
                    });
                }
                let commands = pairs
                    .iter()
                    .map(|p| LampCommand::parse_pair(p))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Command::SetLamps(commands))
            }
            3 | 4 => Ok(Command::Bare(opcode)),
            5 => set.map(Command::SetMode).ok_or(PacketError::MissingArgument {
                opcode,
                needs: "--set auto|manual",
            }),
            other => Err(PacketError::InvalidOpcode(other)),
        }
    }

    pub fn opcode(&self) -> u8 {
        match self {
            Command::SetLamp(_) => 1,
            Command::SetLamps(_) => 2,
            Command::Bare(op) => *op,
            Command::SetMode(_) => 5,
        }
    }

    pub fn data(&self) -> Value {
        match self {
            Command::SetLamp(c) => json!({ "lamp": c.lamp, "color": c.color }),
            Command::SetLamps(cmds) => {
                let commands: Vec<Value> = cmds
                    .iter()
                    .map(|c| json!({ "lamp": c.lamp, "color": c.color }))
                    .collect();
                json!({ "commands": commands })
            }
            Command::Bare(_) => json!({}),
            Command::SetMode(mode) => json!({ "set": mode.as_query() }),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Packet {
    pub id_src: i64,
    pub id_des: i64,
    pub opcode: u8,
    pub time: i64,
    pub data: Value,
    pub auth: String,
}

impl Packet {
    pub fn build(command: &Command, id_src: i64, id_des: i64, time: i64, key: &str) -> Self {
        let opcode = command.opcode();
        let data = command.data();
        let auth = make_auth(id_src, id_des, opcode as i64, &data, time, key);
        Packet {
            id_src,
            id_des,
            opcode,
            time,
            data,
            auth,
        }
    }

    /// Compact wire form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

pub fn make_auth(id_src: i64, id_des: i64, opcode: i64, data: &Value, time: i64, key: &str) -> String {
    let data_str = serde_json::to_string(data).unwrap_or_else(|_| "null".to_string());
    let raw = format!("{}{}{}{}{}{}", id_src, id_des, opcode, data_str, time, key);
    format!("{:x}", Md5::digest(raw.as_bytes()))
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Verification {
    pub md5_match: bool,
    pub expected_auth: String,
    pub response_auth: String,
    pub response_status: Option<Value>,
    pub note: &'static str,
}

fn int_field(obj: &Value, name: &str, which: &'static str) -> Result<i64, PacketError> {
    let bad = || PacketError::BadField {
        which,
        field: name.to_string(),
    };
    match obj.get(name).ok_or_else(bad)? {
        Value::Number(n) => n.as_i64().ok_or_else(bad),
        Value::String(s) => s.trim().parse().map_err(|_| bad()),
        _ => Err(bad()),
    }
}

/// Check a controller response's `auth` against the request it answers.
pub fn verify_response(request_json: &str, response_json: &str, key: &str) -> Result<Verification, PacketError> {
    let req: Value = serde_json::from_str(request_json).map_err(|e| PacketError::Json(e.to_string()))?;
    let resp: Value = serde_json::from_str(response_json).map_err(|e| PacketError::Json(e.to_string()))?;

    let id_src = int_field(&req, "id_src", "request")?;
    let id_des = int_field(&req, "id_des", "request")?;
    let opcode = int_field(&req, "opcode", "request")?;
    let data = req.get("data").ok_or(PacketError::BadField {
        which: "request",
        field: "data".to_string(),
    })?;

    let time = int_field(&resp, "time", "response")?;
    let response_auth = match resp.get("auth") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => {
            return Err(PacketError::BadField {
                which: "response",
                field: "auth".to_string(),
            })
        }
    };

    let expected_auth = make_auth(id_src, id_des, opcode, data, time, key);
    Ok(Verification {
        md5_match: expected_auth.eq_ignore_ascii_case(&response_auth),
        expected_auth,
        response_auth,
        response_status: resp.get("status").cloned(),
        note: "Match=True means response integrity OK and key/opcode/data/time formula consistent.",
    })
}
