use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::time::{SystemTime, UNIX_EPOCH};

use signalpanel::packet::{self, Command, Packet, DEFAULT_ID_DES, DEFAULT_ID_SRC, DEFAULT_KEY};
use signalpanel::status::OperatingMode;

/// ESP32 JSON packet builder and response MD5 verifier
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Auto,
    Manual,
}

impl From<ModeArg> for OperatingMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Auto => OperatingMode::Auto,
            ModeArg::Manual => OperatingMode::Manual,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Build a request packet and print it
    Build {
        /// 1..5
        #[arg(long)]
        opcode: u8,
        /// For opcode 1
        #[arg(long)]
        lamp: Option<i64>,
        /// R|Y|G for opcode 1
        #[arg(long)]
        color: Option<String>,
        /// For opcode 2: list like 1:R 2:Y 3:G
        #[arg(long, num_args = 1..)]
        pairs: Vec<String>,
        /// For opcode 5
        #[arg(long, value_enum)]
        set: Option<ModeArg>,
        #[arg(long, default_value_t = DEFAULT_ID_SRC)]
        id_src: i64,
        #[arg(long, default_value_t = DEFAULT_ID_DES)]
        id_des: i64,
        #[arg(long, default_value = DEFAULT_KEY)]
        key: String,
        /// Epoch seconds; default now
        #[arg(long)]
        time: Option<i64>,
    },
    /// Verify a response MD5 using the original request JSON
    Verify {
        /// Minified request JSON string you sent
        #[arg(long)]
        request_json: String,
        /// Response JSON string from the ESP32
        #[arg(long)]
        response_json: String,
        #[arg(long, default_value = DEFAULT_KEY)]
        key: String,
    },
}

fn now_epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

fn main() -> Result<()> {
    env_logger::builder()
        .format_timestamp(None)
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    match Args::parse().cmd {
        Cmd::Build { opcode, lamp, color, pairs, set, id_src, id_des, key, time } => {
            let command = Command::from_args(opcode, lamp, color.as_deref(), &pairs, set.map(Into::into))?;
            let time = time.unwrap_or_else(now_epoch_secs);
            let pkt = Packet::build(&command, id_src, id_des, time, &key);
            println!("{}", pkt.to_json()?);
        }
        Cmd::Verify { request_json, response_json, key } => {
            let report = packet::verify_response(&request_json, &response_json, &key)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
