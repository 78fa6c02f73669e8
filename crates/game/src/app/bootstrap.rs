use std::env;
use std::path::{Path, PathBuf};

use polywalk_engine::{
    load_sim_config, AudioBank, ConfigError, HostWiring, LocationSink, LocationSinkError,
    LogLocationSink, LoopConfig, SceneSource, SimConfig, Simulation, ThreadedLocationSink,
    TUNING_ENV_VAR,
};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::location_log::JsonLinesLocationSink;

#[derive(Debug, Error)]
pub(crate) enum StartupError {
    #[error("{0}")]
    Cli(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to open location log '{path}': {source}")]
    LocationLog {
        path: PathBuf,
        #[source]
        source: LocationSinkError,
    },
    #[error("failed to start location sink: {0}")]
    LocationWorker(#[source] LocationSinkError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CliOptions {
    pub(crate) scene_path: PathBuf,
    pub(crate) tuning_path: Option<PathBuf>,
    pub(crate) location_log: Option<PathBuf>,
    pub(crate) window_width: Option<u32>,
    pub(crate) window_height: Option<u32>,
}

/// Returns `Ok(None)` when only help was requested.
pub(crate) fn build_app(args: &[String]) -> Result<Option<HostWiring>, StartupError> {
    let options = match parse_cli(args).map_err(StartupError::Cli)? {
        Some(options) => options,
        None => {
            println!("{}", usage_text());
            return Ok(None);
        }
    };

    init_tracing();
    info!("=== polywalk startup ===");

    let tuning_path = options
        .tuning_path
        .clone()
        .or_else(|| env::var_os(TUNING_ENV_VAR).map(PathBuf::from));
    let sim_config = match tuning_path {
        Some(path) => {
            let config = load_sim_config(&path)?;
            info!(path = %path.display(), "tuning_loaded");
            config
        }
        None => SimConfig::default(),
    };

    let defaults = LoopConfig::default();
    let loop_config = LoopConfig {
        window_width: options.window_width.unwrap_or(defaults.window_width),
        window_height: options.window_height.unwrap_or(defaults.window_height),
        ..defaults
    };

    let sink = build_location_sink(options.location_log.as_deref())?;
    let simulation = Simulation::new(
        sim_config,
        loop_config.window_width,
        loop_config.window_height,
        sink,
    )?;

    Ok(Some(HostWiring {
        loop_config,
        simulation,
        scene_source: SceneSource::new(options.scene_path),
        audio_bank: AudioBank::default(),
    }))
}

fn build_location_sink(log_path: Option<&Path>) -> Result<Box<dyn LocationSink>, StartupError> {
    let inner: Box<dyn LocationSink> = match log_path {
        Some(path) => {
            let sink = JsonLinesLocationSink::open(path).map_err(|source| {
                StartupError::LocationLog {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            info!(path = %path.display(), "location_log_enabled");
            Box::new(sink)
        }
        None => Box::new(LogLocationSink),
    };
    let threaded = ThreadedLocationSink::spawn("location-sink", inner)
        .map_err(StartupError::LocationWorker)?;
    Ok(Box::new(threaded))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

pub(crate) fn parse_cli(args: &[String]) -> Result<Option<CliOptions>, String> {
    if args.is_empty() {
        return Err(usage_text());
    }
    if args[0] == "-h" || args[0] == "--help" {
        return Ok(None);
    }

    let mut scene_path = None;
    let mut tuning_path = None;
    let mut location_log = None;
    let mut window_width = None;
    let mut window_height = None;
    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "-h" | "--help" => return Ok(None),
            "--tuning" => {
                tuning_path = Some(PathBuf::from(flag_value(args, index, "--tuning")?));
                index += 2;
            }
            "--location-log" => {
                location_log = Some(PathBuf::from(flag_value(args, index, "--location-log")?));
                index += 2;
            }
            "--width" => {
                window_width =
                    Some(parse_dimension(flag_value(args, index, "--width")?, "--width")?);
                index += 2;
            }
            "--height" => {
                window_height =
                    Some(parse_dimension(flag_value(args, index, "--height")?, "--height")?);
                index += 2;
            }
            other if other.starts_with("--") => {
                return Err(format!("unknown option '{other}'\n\n{}", usage_text()));
            }
            other => {
                if scene_path.is_some() {
                    return Err(format!("unexpected argument '{other}'"));
                }
                scene_path = Some(PathBuf::from(other));
                index += 1;
            }
        }
    }

    let scene_path = scene_path.ok_or_else(|| "missing scene manifest path".to_string())?;
    Ok(Some(CliOptions {
        scene_path,
        tuning_path,
        location_log,
        window_width,
        window_height,
    }))
}

fn flag_value<'a>(args: &'a [String], index: usize, flag: &str) -> Result<&'a str, String> {
    args.get(index + 1)
        .map(String::as_str)
        .ok_or_else(|| format!("missing value for {flag}"))
}

fn parse_dimension(value: &str, flag: &str) -> Result<u32, String> {
    match value.parse::<u32>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(format!(
            "invalid {flag} value '{value}' (expected positive integer)"
        )),
    }
}

fn usage_text() -> String {
    [
        "polywalk - walk a character across polygon terrain",
        "",
        "Usage:",
        "  polywalk <scene.json> [--tuning <file>] [--location-log <file>] [--width <px>] [--height <px>]",
        "",
        "Environment:",
        "  POLYWALK_TUNING        tuning file used when --tuning is absent",
        "  POLYWALK_SLOW_FRAME_MS artificial per-frame delay for loop testing",
        "  RUST_LOG               tracing filter (default: info)",
        "",
        "Keys:",
        "  Left/Right move, Up/Space jump, Down drop through",
        "  S speak, D dance, W wave, F2 background, F3 outlines, F5 reload, Esc quit",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn scene_path_alone_is_enough() {
        let options = parse_cli(&args(&["scene.json"]))
            .expect("parse")
            .expect("options");
        assert_eq!(options.scene_path, PathBuf::from("scene.json"));
        assert_eq!(options.tuning_path, None);
        assert_eq!(options.window_width, None);
    }

    #[test]
    fn flags_may_precede_or_follow_the_scene() {
        let options = parse_cli(&args(&[
            "--width",
            "640",
            "scene.json",
            "--tuning",
            "tuning.json",
            "--location-log",
            "out.jsonl",
            "--height",
            "480",
        ]))
        .expect("parse")
        .expect("options");
        assert_eq!(options.window_width, Some(640));
        assert_eq!(options.window_height, Some(480));
        assert_eq!(options.tuning_path, Some(PathBuf::from("tuning.json")));
        assert_eq!(options.location_log, Some(PathBuf::from("out.jsonl")));
    }

    #[test]
    fn help_short_circuits() {
        assert_eq!(parse_cli(&args(&["--help"])).expect("parse"), None);
        assert_eq!(
            parse_cli(&args(&["scene.json", "-h"])).expect("parse"),
            None
        );
    }

    #[test]
    fn empty_args_return_usage() {
        let err = parse_cli(&[]).expect_err("usage");
        assert!(err.contains("Usage:"));
    }

    #[test]
    fn zero_and_garbage_dimensions_are_rejected() {
        let err = parse_cli(&args(&["scene.json", "--width", "0"])).expect_err("zero");
        assert!(err.contains("--width"));
        assert!(parse_cli(&args(&["scene.json", "--height", "tall"])).is_err());
    }

    #[test]
    fn missing_flag_value_is_reported() {
        let err = parse_cli(&args(&["scene.json", "--tuning"])).expect_err("missing");
        assert_eq!(err, "missing value for --tuning");
    }

    #[test]
    fn unknown_option_and_second_scene_are_rejected() {
        assert!(parse_cli(&args(&["scene.json", "--fly"])).is_err());
        assert!(parse_cli(&args(&["a.json", "b.json"])).is_err());
    }

    #[test]
    fn missing_scene_path_is_reported() {
        let err = parse_cli(&args(&["--width", "640"])).expect_err("missing scene");
        assert_eq!(err, "missing scene manifest path");
    }
}
