use tapedeck::cli::Args;
use tapedeck::config::{self, PlayerSettings};
use tapedeck::entities::ffmpeg_engine::FfmpegEngine;
use tapedeck::entities::media::collect_picked;
use tapedeck::shell::Shell;
use tapedeck::ui::TapedeckApp;

use anyhow::Context;
use clap::Parser;
use eframe::egui;
use log::{debug, info};
use std::time::Instant;

/// Logger from `-v` count and `--log`
fn init_logging(args: &Args, path_config: &config::PathConfig) -> anyhow::Result<()> {
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(log_path_opt) = &args.log_file {
        let log_path = log_path_opt
            .clone()
            .unwrap_or_else(|| config::data_file(config::LOG_FILE, path_config));
        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .filter_module("egui", log::LevelFilter::Info) // Suppress egui DEBUG spam
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!("Logging to file: {} (level: {:?})", log_path.display(), log_level);
    } else {
        // Console logging (respects RUST_LOG if set)
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .filter_module("egui", log::LevelFilter::Info)
            .format_timestamp_millis()
            .init();
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    playa_ffmpeg::init().context("Failed to initialize FFmpeg")?;

    let args = Args::parse();

    let path_config = config::PathConfig::from_env_and_cli(args.config_dir.clone());
    if let Err(e) = config::ensure_dirs(&path_config) {
        eprintln!("Warning: Failed to create application directories: {:#}", e);
    }

    init_logging(&args, &path_config)?;

    info!("Tapedeck starting...");
    debug!("Command-line args: {:?}", args);

    let settings_path = config::config_file(config::SETTINGS_FILE, &path_config);
    info!("Config path: {}", settings_path.display());

    // CLI flags apply to this run only; the file keeps its own values
    let persisted = PlayerSettings::load_or_default(&settings_path);
    let mut settings = persisted.clone();
    args.apply_to(&mut settings);

    let mut shell = Shell::new(FfmpegEngine::new(settings.status_interval_ms), &settings);

    let mut files = collect_picked(&args.files);
    if files.is_empty() {
        info!("No input files, starting empty (drag-and-drop supported)");
    } else {
        let first = files.remove(0);
        info!("Opening {}", first.uri);
        shell.open_file(first, Instant::now());
        shell.add_files(files);
    }

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(format!("Tapedeck v{} • F1 for help", env!("CARGO_PKG_VERSION")))
            .with_inner_size([960.0, 600.0])
            .with_resizable(true)
            .with_drag_and_drop(true)
            .with_fullscreen(settings.start_fullscreen)
            .with_decorations(!settings.start_fullscreen),
        ..Default::default()
    };

    let status_interval_ms = settings.status_interval_ms;
    eframe::run_native(
        "Tapedeck",
        native_options,
        Box::new(move |_cc| {
            Ok(Box::new(TapedeckApp::new(
                shell,
                persisted,
                status_interval_ms,
                settings_path,
            )))
        }),
    )
    .map_err(|e| anyhow::anyhow!("Window loop failed: {}", e))?;

    info!("Application exiting");
    Ok(())
}
