//! jukebar CLI — drives the playback controller against a simulated runtime.
//!
//! Commands:
//!   jukebar demo [media-id]            Play a simulated track to the end
//!   jukebar run <script.json>          Run a JSON scenario, print the report
//!   jukebar thumb <link-or-id> [q]     Print a thumbnail URL
//!   jukebar config                     Print the effective configuration
//!
//! Options:
//!   --config <path>                    Config file (else $JUKEBAR_CONFIG)

mod script;

use std::path::Path;

use jukebar_core::links::{self, ThumbnailQuality};
use jukebar_core::{
    Engine, PlayerConfig, PlayerSurface, SimulatedRuntime, SurfaceGesture, SurfaceKind, Track,
};

const DEMO_MEDIA_ID: &str = "dQw4w9WgXcQ";
const DEMO_DURATION: f64 = 12.0;
const DEMO_TICK_MS: u64 = 500;

fn main() {
    env_logger::init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let config_path = take_flag(&mut args, "--config");
    if args.is_empty() {
        print_usage();
        return;
    }

    let config = match load_config(config_path.as_deref()) {
        Some(config) => config,
        None => return,
    };

    match args[0].as_str() {
        "demo" => cmd_demo(config, &args[1..]),
        "run" => cmd_run(config, &args[1..]),
        "thumb" => cmd_thumb(&config, &args[1..]),
        "config" => cmd_config(&config),
        other => {
            eprintln!("unknown command: {}", other);
            print_usage();
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_demo(config: PlayerConfig, args: &[String]) {
    let media_id = match args.first() {
        Some(link) => match links::parse_media_id(link) {
            Some(id) => id,
            None => {
                eprintln!("not a media link or id: {}", link);
                return;
            }
        },
        None => DEMO_MEDIA_ID.to_string(),
    };

    let sim = SimulatedRuntime::responsive();
    sim.set_duration(&media_id, DEMO_DURATION);
    let mut engine = Engine::with_config(Box::new(sim.clone()), config);
    let mut bar = PlayerSurface::mount(&mut engine, SurfaceKind::BottomBar);

    let track = Track::new(media_id.as_str(), "Demo track", "jukebar", "demo");
    println!("{}", links::watch_url(&media_id));
    engine.play_pause(track);

    let mut scrubbed = false;
    loop {
        engine.advance(DEMO_TICK_MS);
        let view = bar.render(&engine);
        print_progress(
            view.title.as_deref().unwrap_or("?"),
            view.subtitle.as_deref().unwrap_or(""),
            view.position,
            view.duration,
            view.volume,
        );

        if !scrubbed && view.position > 0.0 && view.duration > 0.0 {
            // Drag to the middle in a few frames, then release.
            let target = view.duration / 2.0;
            for step in 1..=4 {
                bar.handle(&mut engine, SurfaceGesture::ScrubChange(target * step as f64 / 4.0));
            }
            bar.handle(&mut engine, SurfaceGesture::ScrubCommit(target));
            scrubbed = true;
        }
        if scrubbed && !view.is_playing {
            break; // Track finished
        }
        if engine.now_ms() > 10 * 60 * 1000 {
            eprintln!("\ndemo did not finish");
            break;
        }
    }
    println!();

    bar.handle(&mut engine, SurfaceGesture::Close);
    for call in sim.calls() {
        println!("  {}", call);
    }
    bar.unmount(&mut engine);
}

fn cmd_run(config: PlayerConfig, args: &[String]) {
    if args.is_empty() {
        eprintln!("usage: jukebar run <script.json>");
        return;
    }
    let scenario = match script::Scenario::load(Path::new(&args[0])) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("bad script {}: {}", args[0], e);
            return;
        }
    };
    let report = scenario.run(config);
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("report: {}", e),
    }
}

fn cmd_thumb(config: &PlayerConfig, args: &[String]) {
    if args.is_empty() {
        eprintln!("usage: jukebar thumb <link-or-id> [quality]");
        return;
    }
    let Some(media_id) = links::parse_media_id(&args[0]) else {
        eprintln!("not a media link or id: {}", args[0]);
        return;
    };
    let quality = match args.get(1) {
        Some(q) => match ThumbnailQuality::parse(q) {
            Some(quality) => quality,
            None => {
                eprintln!("unknown quality: {}", q);
                return;
            }
        },
        None => config.thumbnail_quality,
    };
    println!("{}", links::thumbnail_url(&media_id, quality));
}

fn cmd_config(config: &PlayerConfig) {
    println!("{}", serde_json::to_string_pretty(config).unwrap_or_default());
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn take_flag(args: &mut Vec<String>, flag: &str) -> Option<String> {
    let idx = args.iter().position(|a| a == flag)?;
    args.remove(idx);
    if idx < args.len() {
        Some(args.remove(idx))
    } else {
        eprintln!("{} needs a value", flag);
        None
    }
}

fn load_config(path: Option<&str>) -> Option<PlayerConfig> {
    let loaded = match path {
        Some(path) => PlayerConfig::load(Path::new(path)),
        None => PlayerConfig::from_env(),
    };
    match loaded {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("config: {}", e);
            None
        }
    }
}

fn print_progress(title: &str, subtitle: &str, pos: f64, dur: f64, vol: u8) {
    let bar_width = 30;
    let filled = if dur > 0.0 {
        ((pos / dur).clamp(0.0, 1.0) * bar_width as f64) as usize
    } else {
        0
    };
    let empty = bar_width - filled;

    print!(
        "\r  {} -- {}  [{}{}] {} / {}  vol: {}%    ",
        title,
        subtitle,
        "=".repeat(filled),
        " ".repeat(empty),
        fmt_time(pos),
        fmt_time(dur),
        vol,
    );
    use std::io::Write;
    std::io::stdout().flush().ok();
}

fn fmt_time(seconds: f64) -> String {
    let secs = seconds.max(0.0) as u64;
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn print_usage() {
    println!("jukebar - embedded player controller (simulated runtime)");
    println!();
    println!("usage: jukebar [--config <path>] <command> [args]");
    println!();
    println!("commands:");
    println!("  demo [media-id]          Play a simulated track to the end");
    println!("  run <script.json>        Run a JSON scenario and print the report");
    println!("  thumb <link-or-id> [q]   Print a thumbnail URL");
    println!("  config                   Print the effective configuration");
}
