mod config;
mod display;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use hover_input::{get_normalized_input, InputDevice, InputNormalizer, NoDevice};
use hover_link::probe::probe_link;
use hover_link::{flight, CommandChannel, CommandDispatcher, CommandLink, LoopGuard, SharedState, TelemetryAggregator};
use hover_proto::telemetry::parse_pairs;
use hover_proto::{Command as Wire, ConnectionStatus, Direction, Rotation};
use hover_video::{LatestFrame, UdpFrameSource, VideoPump};

use config::{check_all, load_config, write_config, Config};
use display::{save_photo, status_line, ButtonEdges};

#[derive(Debug, Parser)]
#[command(name = "hover", version, about = "hover - teleoperation for small UDP-controlled quadcopters")]
struct Cli {
    #[arg(long, default_value = "hover.toml")]
    config: PathBuf,

    /// Debug logging when RUST_LOG is unset.
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the configuration.
    Doctor,
    Config { #[command(subcommand)] cmd: ConfigCmd },
    /// Fly with the controller.
    Run,
    /// Send raw command text and print the reply.
    Send { #[arg(required = true)] text: Vec<String> },
    Battery,
    State,
    Takeoff,
    Land,
    Emergency,
    Move { dir: Direction, cm: u32 },
    Rotate { rot: Rotation, deg: u32 },
    Link { #[command(subcommand)] cmd: LinkCmd },
    Input { #[command(subcommand)] cmd: InputCmd },
}

#[derive(Debug, Subcommand)]
enum ConfigCmd {
    /// Write the default configuration to --config.
    Init { #[arg(long)] force: bool },
}

#[derive(Debug, Subcommand)]
enum LinkCmd {
    /// Check that the vehicle answers `command` with `ok`.
    Probe,
}

#[derive(Debug, Subcommand)]
enum InputCmd {
    /// Print raw and normalized controller input until Ctrl-C.
    Test,
    /// Measure resting stick offsets and store them in the config file.
    Calibrate { #[arg(long, default_value_t = 50)] samples: usize },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // the one command that must not read the file it is about to write
    let cmd = match cli.cmd {
        Command::Config { cmd: ConfigCmd::Init { force } } => {
            return write_config(&cli.config, &Config::default(), force);
        }
        cmd => cmd,
    };

    let cfg = load_config(&cli.config)?;

    match cmd {
        Command::Doctor => doctor(&cfg),
        Command::Run => run(&cfg).await,
        Command::Link { cmd: LinkCmd::Probe } => link_probe(&cfg),
        Command::Input { cmd } => input_cmd(&cfg, &cli.config, cmd).await,
        one_shot => one_shot_cmd(&cfg, one_shot),
    }
}

fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");
    check_all(cfg)?;
    info!("doctor: OK");
    Ok(())
}

fn open_channel(cfg: &Config) -> Result<CommandChannel> {
    CommandChannel::open(cfg.drone.peer_addr()?, cfg.drone.response_addr()?).context("open command channel")
}

fn link_probe(cfg: &Config) -> Result<()> {
    let link = open_channel(cfg)?;
    let report = probe_link(&link, cfg.drone.probe_attempts, cfg.telemetry.response_timeout());
    println!("sdk_ok={} battery={:?}", report.sdk_ok, report.battery);
    for (i, a) in report.attempts.iter().enumerate() {
        println!("attempt {} {}ms reply={:?} note={}", i + 1, a.elapsed_ms, a.reply, a.note);
    }
    anyhow::ensure!(report.sdk_ok, "vehicle did not answer at {}", link.peer());
    Ok(())
}

fn one_shot_cmd(cfg: &Config, cmd: Command) -> Result<()> {
    let link = open_channel(cfg)?;
    let timeout = cfg.telemetry.response_timeout();

    match cmd {
        Command::Send { text } => {
            let reply = link.send_and_await_response(&Wire::Raw(text.join(" ")), Duration::ZERO, timeout)?;
            println!("{}", reply);
        }
        Command::Battery => println!("{}%", link.battery(timeout)?),
        Command::State => {
            let reply = link.send_and_await_response(&Wire::State, Wire::State.default_wait(), timeout)?;
            for (k, v) in parse_pairs(&reply) {
                println!("{}={}", k, v);
            }
        }
        verb => {
            link.activate_sdk_mode()?;
            match verb {
                Command::Takeoff => link.takeoff()?,
                Command::Land => link.land()?,
                Command::Emergency => link.emergency()?,
                Command::Move { dir, cm } => link.move_by(dir, cm)?,
                Command::Rotate { rot, deg } => link.rotate_by(rot, deg)?,
                other => anyhow::bail!("not a one-shot command: {:?}", other),
            }
            info!("done");
        }
    }
    Ok(())
}

fn open_input() -> Result<Box<dyn InputDevice>> {
    #[cfg(feature = "gamepad")]
    {
        let dev = hover_input::gamepad::GamepadDevice::open()?;
        for pad in dev.list() {
            info!("gamepad found: {}", pad);
        }
        Ok(Box::new(dev))
    }
    #[cfg(not(feature = "gamepad"))]
    {
        anyhow::bail!("controller support not built in; rebuild with --features gamepad")
    }
}

fn ctrl_c_flag() -> Arc<AtomicBool> {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c: stopping");
            flag.store(true, Ordering::Relaxed);
        }
    });
    cancel
}

async fn input_cmd(cfg: &Config, path: &Path, cmd: InputCmd) -> Result<()> {
    let mut dev = open_input()?;
    match cmd {
        InputCmd::Test => {
            anyhow::ensure!(dev.is_available(), "no controller connected");
            let normalizer = InputNormalizer::new(cfg.input.clone());
            let cancel = ctrl_c_flag();
            while !cancel.load(Ordering::Relaxed) {
                if let Some(raw) = dev.poll() {
                    let i = normalizer.normalize(&raw);
                    println!(
                        "raw={:?} buttons={:?} -> x={:.2} y={:.2} z={:.2} r={:.2}",
                        raw.axes, raw.buttons, i.x, i.y, i.z, i.rotation
                    );
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            Ok(())
        }
        InputCmd::Calibrate { samples } => {
            println!("leave the sticks centred");
            let input = hover_input::calibrate::calibrate(dev.as_mut(), &cfg.input, samples, Duration::from_millis(20))?;
            let updated = Config { input, ..cfg.clone() };
            write_config(path, &updated, true)
        }
    }
}

async fn run(cfg: &Config) -> Result<()> {
    info!("run: starting");

    // the only fatal failure: no command socket
    let link = Arc::new(open_channel(cfg)?);
    let state = SharedState::new();
    state.set_link_status(ConnectionStatus::Connected);
    let cancel = ctrl_c_flag();

    {
        let l = link.clone();
        let attempts = cfg.drone.probe_attempts;
        let timeout = cfg.telemetry.response_timeout();
        let video = cfg.video.enable;
        let report = tokio::task::spawn_blocking(move || {
            let report = probe_link(&*l, attempts, timeout);
            let started = if video { l.start_video_stream() } else { l.activate_sdk_mode() };
            if let Err(e) = started {
                warn!("sdk mode / stream start failed: {}", e);
            }
            report
        })
        .await?;
        if !report.sdk_ok {
            warn!("vehicle silent at {}; continuing", link.peer());
        } else if let Some(pct) = report.battery {
            state.set_battery(pct, cfg.telemetry.low_battery_pct);
        }
    }

    let dispatcher = CommandDispatcher::new(link.clone(), state.clone(), cfg.dispatch.clone());
    let dispatch_h = {
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || dispatcher.run(cancel))
    };

    let telemetry = TelemetryAggregator::new(link.clone(), state.clone(), cfg.telemetry.clone())
        .with_guard(LoopGuard::new("telemetry", &cfg.dispatch));
    let telemetry_h = {
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || telemetry.run(cancel))
    };

    let mut latest = None;
    let mut video_h = None;
    if cfg.video.enable {
        let src = UdpFrameSource::new(cfg.drone.video_addr()?, cfg.video.read_timeout());
        let pump = VideoPump::new(src, cfg.video.clone(), state.clone())
            .with_guard(LoopGuard::new("video", &cfg.dispatch));
        latest = Some(pump.latest());
        let cancel = cancel.clone();
        video_h = Some(tokio::task::spawn_blocking(move || pump.run(cancel)));
    }

    let dev = match open_input() {
        Ok(dev) => dev,
        Err(e) => {
            warn!("{:#}; flying without a controller", e);
            Box::new(NoDevice)
        }
    };
    display_loop(cfg, dev, &link, &state, latest, &cancel).await;

    info!("run: shutting down");
    cancel.store(true, Ordering::Relaxed);
    for (name, h) in [("dispatcher", Some(dispatch_h)), ("telemetry", Some(telemetry_h)), ("video", video_h)] {
        if let Some(h) = h {
            if let Err(e) = h.await {
                warn!("{} loop did not stop cleanly: {}", name, e);
            }
        }
    }

    let flying = state.is_flying();
    let video = cfg.video.enable;
    let teardown_link = link.clone();
    tokio::task::spawn_blocking(move || {
        if flying {
            info!("still flying: landing");
            if let Err(e) = teardown_link.land() {
                warn!("final land failed: {}", e);
            }
        }
        if video {
            if let Err(e) = teardown_link.stop_video_stream() {
                warn!("streamoff failed: {}", e);
            }
        }
    })
    .await?;
    state.set_flying(false);
    info!("run: stopped");
    Ok(())
}

/// Polls input, publishes the intent and fires edge-triggered verbs until cancelled.
async fn display_loop(
    cfg: &Config,
    mut dev: Box<dyn InputDevice>,
    link: &Arc<CommandChannel>,
    state: &SharedState,
    latest: Option<LatestFrame>,
    cancel: &Arc<AtomicBool>,
) {
    let normalizer = InputNormalizer::new(cfg.input.clone());
    let mut edges = ButtonEdges::default();
    let busy = Arc::new(AtomicBool::new(false));
    let mut tick = tokio::time::interval(cfg.display.tick());
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut last_status = Instant::now();

    info!("controller: {}", dev.name());
    while !cancel.load(Ordering::Relaxed) {
        tick.tick().await;

        let intent = get_normalized_input(dev.as_mut(), &normalizer).unwrap_or_default();
        state.set_intent(intent);
        let e = edges.update(&intent);

        if e.emergency {
            warn!("EMERGENCY");
            state.trip_emergency();
            spawn_verb(link, &busy, true, "emergency", |l| l.emergency());
        } else if e.takeoff && !state.is_flying() {
            let st = state.clone();
            spawn_verb(link, &busy, false, "takeoff", move |l| flight::takeoff(l, &st));
        } else if e.land && state.is_flying() {
            state.set_flying(false);
            spawn_verb(link, &busy, false, "land", |l| l.land());
        }

        if e.photo {
            match latest.as_ref().and_then(|l| l.get()) {
                Some(frame) => match save_photo(&cfg.display.photo_dir, &frame.data).await {
                    Ok(p) => info!("photo saved: {}", p.display()),
                    Err(err) => warn!("photo failed: {:#}", err),
                },
                None => warn!("photo: no video frame yet"),
            }
        }

        if last_status.elapsed() >= cfg.display.status_every() {
            last_status = Instant::now();
            info!("{}", status_line(&state.snapshot()));
        }
    }
}

/// Runs one blocking verb off the display task. `force` bypasses the
/// one-at-a-time guard (emergency must never wait behind a takeoff).
fn spawn_verb<F>(link: &Arc<CommandChannel>, busy: &Arc<AtomicBool>, force: bool, name: &'static str, f: F)
where
    F: FnOnce(&CommandChannel) -> Result<(), hover_link::TransportError> + Send + 'static,
{
    if busy.swap(true, Ordering::SeqCst) && !force {
        warn!("{} ignored: another command in progress", name);
        return;
    }
    let link = link.clone();
    let busy = busy.clone();
    tokio::task::spawn_blocking(move || {
        info!("{}", name);
        if let Err(e) = f(&link) {
            warn!("{} failed: {}", name, e);
        }
        busy.store(false, Ordering::SeqCst);
    });
}
