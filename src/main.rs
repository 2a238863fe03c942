use anyhow::Result;
use clap::Parser;
use log::{info, warn, error};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use signalpanel::client::HttpControllerApi;
use signalpanel::clock::MonotonicClock;
use signalpanel::command::{self, ShellCommand, HELP};
use signalpanel::config::PanelConfig;
use signalpanel::controller::PanelController;
use signalpanel::request::Reply;
use signalpanel::worker::RequestRunner;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Controller base URL, e.g. http://192.168.4.1
    #[arg(short, long)]
    url: Option<String>,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    interval_ms: Option<u64>,

    #[arg(long)]
    grace_ms: Option<u64>,

    /// Print the panel after every refresh instead of only on `show`
    #[arg(long, default_value_t = false)]
    watch: bool,
}

enum Input {
    Line(String),
    Closed,
    Reply(Reply),
}

impl From<Reply> for Input {
    fn from(reply: Reply) -> Self {
        Input::Reply(reply)
    }
}

fn load_config(args: &Args) -> Result<PanelConfig> {
    let mut config = match &args.config {
        Some(path) => PanelConfig::load(path)?,
        None => PanelConfig::default(),
    };
    if let Some(url) = &args.url {
        config.controller.base_url = url.clone();
    }
    if let Some(ms) = args.interval_ms {
        config.timing.poll_interval_ms = ms;
    }
    if let Some(ms) = args.grace_ms {
        config.timing.edit_grace_ms = ms;
    }
    Ok(config)
}

// Reads stdin on its own thread; all panel work stays on the main thread.
fn spawn_stdin_reader(tx: mpsc::Sender<Input>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(Input::Line(line)).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!("stdin read failed: {}", e);
                    break;
                }
            }
        }
        let _ = tx.send(Input::Closed);
    });
}

fn main() -> Result<()> {
    env_logger::builder()
        .format_timestamp(None)
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();
    let config = match load_config(&args) {
        Ok(c) => c,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    };

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        info!("Ctrl+C received. Shutting down...");
        r.store(false, Ordering::SeqCst);
    })?;

    let api = Arc::new(HttpControllerApi::new(&config.controller)?);
    info!("Controller: {}", config.controller.base_url);

    let (tx, rx) = mpsc::channel();
    let runner = RequestRunner::new(Arc::clone(&api), tx.clone());
    let mut panel = PanelController::new(api, MonotonicClock::new(), &config);
    let interval = Duration::from_millis(config.timing.poll_interval_ms.max(1));

    spawn_stdin_reader(tx);
    println!("{}", HELP);

    runner.submit(panel.begin_poll());
    let mut next_tick = Instant::now() + interval;

    // Requests run on worker threads; this loop only applies their replies,
    // so a slow controller never holds up the timer or the operator.
    while running.load(Ordering::SeqCst) {
        let wait = next_tick.saturating_duration_since(Instant::now());
        match rx.recv_timeout(wait) {
            Ok(Input::Line(line)) => match command::parse_line(&line) {
                Ok(Some(ShellCommand::Events(events))) => {
                    for event in events {
                        runner.submit_all(panel.begin(event));
                    }
                }
                Ok(Some(ShellCommand::Show)) => println!("{}", panel.panel()),
                Ok(Some(ShellCommand::Help)) => println!("{}", HELP),
                Ok(Some(ShellCommand::Quit)) => break,
                Ok(None) => {}
                Err(e) => println!("{}", e),
            },
            Ok(Input::Reply(reply)) => {
                let applied = panel.reconciler().last_applied();
                runner.submit_all(panel.complete(reply));
                if args.watch && panel.reconciler().last_applied() != applied {
                    println!("{}\n", panel.panel());
                }
            }
            Ok(Input::Closed) | Err(RecvTimeoutError::Disconnected) => {
                info!("Input closed. Exiting.");
                break;
            }
            Err(RecvTimeoutError::Timeout) => {
                next_tick += interval;
                if next_tick < Instant::now() {
                    next_tick = Instant::now() + interval;
                }
                runner.submit(panel.begin_poll());
            }
        }

        for notice in panel.take_notices() {
            println!("!! {}", notice);
        }
    }

    info!("Exiting.");
    Ok(())
}
