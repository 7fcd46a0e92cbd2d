// PixelDeck
// copyright zipxing@hotmail.com 2022～2025

/// deck-harness runs the demo screens on a chosen backend...
///
/// Usage:
/// deck-harness --script main-screen -o out
/// deck-harness --driver offscreen --script options -o out
/// deck-harness --script replay --replay run.rep -o out
/// deck-harness --driver opengl
///
/// Text and offscreen runs follow a scripted timeline and write
/// snapshots to {output}/screens/{tick:06}.txt or .png
///
mod cards;

use clap::{value_parser, Arg, ArgMatches, Command};
use cards::Splash;
use log::{error, info};
use pixel_deck::config::{DeckConfig, DriverKind};
use pixel_deck::event::Key;
use pixel_deck::log::init_log;
use pixel_deck::render::adapter::text::TextVideoDriver;
use pixel_deck::replay::ReplayData;
use pixel_deck::scheduler::EventScheduler;
use pixel_deck::time::Ticks;
use pixel_deck::{DeckError, DeckResult};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const SPLASH_TICKS: Ticks = Ticks(120);

fn make_parser() -> ArgMatches {
    Command::new("deck-harness")
        .author("zipxing@hotmail.com")
        .about("PixelDeck demo and capture harness")
        .arg(
            Arg::new("driver")
                .long("driver")
                .value_parser(["text", "offscreen", "opengl"]),
        )
        .arg(Arg::new("output").short('o').long("output"))
        .arg(
            Arg::new("width")
                .long("width")
                .value_parser(value_parser!(i32)),
        )
        .arg(
            Arg::new("height")
                .long("height")
                .value_parser(value_parser!(i32)),
        )
        .arg(Arg::new("config").long("config"))
        .arg(
            Arg::new("script")
                .long("script")
                .default_value("main-screen")
                .value_parser(["main-screen", "options", "replay"]),
        )
        .arg(Arg::new("replay").long("replay").required_if_eq("script", "replay"))
        .arg(
            Arg::new("log_level")
                .long("log-level")
                .value_parser(["off", "error", "warn", "info", "debug", "trace"]),
        )
        .get_matches()
}

/// Config file first, then command line overrides.
fn build_config(args: &ArgMatches) -> DeckResult<DeckConfig> {
    let path = args.get_one::<String>("config").map(Path::new);
    let mut config = DeckConfig::load_or_default(path)?;
    if let Some(d) = args.get_one::<String>("driver") {
        config.driver = DriverKind::from_name(d)
            .ok_or_else(|| DeckError::Config(format!("unknown driver {}", d)))?;
    }
    if let Some(o) = args.get_one::<String>("output") {
        config.output_dir = Some(PathBuf::from(o));
    }
    if let Some(w) = args.get_one::<i32>("width") {
        config.width = *w;
    }
    if let Some(h) = args.get_one::<i32>("height") {
        config.height = *h;
    }
    if let Some(l) = args.get_one::<String>("log_level") {
        config.log_level = l.clone();
    }
    if config.width <= 0 || config.height <= 0 {
        return Err(DeckError::Config(format!(
            "screen size {}x{} is not positive",
            config.width, config.height
        )));
    }
    Ok(config)
}

fn key_press(scheduler: &mut EventScheduler, key: Key, at: i64) {
    scheduler.schedule_key(key, Ticks(at), Ticks(at + 1));
}

/// Splash, then the menu, then quit.
fn script_main_screen(scheduler: &mut EventScheduler) {
    scheduler.schedule_snapshot(Ticks(60));
    scheduler.schedule_snapshot(Ticks(180));
    key_press(scheduler, Key::Q, 240);
}

/// Skip the splash, open options, flip the toggle, close and quit.
fn script_options(scheduler: &mut EventScheduler) {
    key_press(scheduler, Key::SPACE, 10);
    key_press(scheduler, Key::O, 30);
    scheduler.schedule_snapshot(Ticks(40));
    key_press(scheduler, Key::RIGHT, 50);
    scheduler.schedule_snapshot(Ticks(60));
    key_press(scheduler, Key::ESCAPE, 70);
    scheduler.schedule_snapshot(Ticks(80));
    key_press(scheduler, Key::Q, 90);
}

/// Plays a recorded key stream, snapshotting once a second. A Q press
/// after the end closes whatever the replay left open.
fn script_replay(scheduler: &mut EventScheduler, path: &Path) -> DeckResult<()> {
    let data = ReplayData::load(path)?;
    info!(
        "replay chapter {} seed {} ({} items)",
        data.chapter_id,
        data.global_seed,
        data.items.len()
    );
    let end = scheduler.schedule_replay(&data, Ticks(1));
    let mut mark = 60;
    while mark < end.count() {
        scheduler.schedule_snapshot(Ticks(mark));
        mark += 60;
    }
    scheduler.schedule_snapshot(end);
    key_press(scheduler, Key::Q, end.count() + 1);
    Ok(())
}

fn scripted(args: &ArgMatches) -> DeckResult<EventScheduler> {
    let mut scheduler = EventScheduler::new();
    match args.get_one::<String>("script").map(String::as_str) {
        Some("options") => script_options(&mut scheduler),
        Some("replay") => {
            let path = args
                .get_one::<String>("replay")
                .ok_or_else(|| DeckError::Config("--replay <file> is required".to_string()))?;
            script_replay(&mut scheduler, Path::new(path))?;
        }
        _ => script_main_screen(&mut scheduler),
    }
    Ok(scheduler)
}

fn run(args: &ArgMatches, config: &DeckConfig) -> DeckResult<()> {
    let initial = Box::new(Splash::new(SPLASH_TICKS));
    let output = config.output_dir.clone();
    match config.driver {
        DriverKind::Text => {
            let mut scheduler = scripted(args)?;
            TextVideoDriver::new(config.screen_size(), scheduler.handle())
                .with_dedup(config.text_dedup)
                .run(&mut scheduler, output, initial)
        }
        #[cfg(feature = "image")]
        DriverKind::Offscreen => {
            use pixel_deck::render::adapter::offscreen::OffscreenVideoDriver;
            let mut scheduler = scripted(args)?;
            OffscreenVideoDriver::new(config.screen_size(), scheduler.handle())
                .run(&mut scheduler, output, initial)
        }
        #[cfg(not(feature = "image"))]
        DriverKind::Offscreen => Err(DeckError::Setup(
            "offscreen driver needs the image feature".to_string(),
        )),
        #[cfg(gl_backend)]
        DriverKind::OpenGl => {
            use pixel_deck::render::adapter::winit_glow::GlMainLoop;
            use pixel_deck::time::WallTime;
            GlMainLoop::new("PixelDeck", config.screen_size(), initial)
                .with_poll_interval(std::time::Duration::from_millis(config.poll_interval_ms))
                .with_double_click(WallTime(config.double_click_usecs))
                .run()
        }
        #[cfg(not(gl_backend))]
        DriverKind::OpenGl => Err(DeckError::Setup(
            "opengl driver needs the winit feature on a desktop target".to_string(),
        )),
    }
}

fn main() -> ExitCode {
    let args = make_parser();
    let config = match build_config(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("deck-harness: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = init_log(config.log_level_filter(), &config.log_file) {
        eprintln!("deck-harness: {}", e);
    }
    info!("deck-harness start {:?}", config);
    match run(&args, &config) {
        Ok(()) => {
            info!("deck-harness done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("deck-harness failed: {}", e);
            eprintln!("deck-harness: {}", e);
            ExitCode::FAILURE
        }
    }
}
