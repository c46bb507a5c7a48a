use clap::Parser;
use std::path::PathBuf;

// Build version with backend info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Media:  playa-ffmpeg 8.0 (static)\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Audio/video player with an auto-hiding transport and a media library
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Media files to add to the library; the first one is opened
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Start playing as soon as the first file is ready
    #[arg(short = 'a', long = "autoplay")]
    pub autoplay: bool,

    /// Start in fullscreen mode
    #[arg(short = 'F', long = "fullscreen")]
    pub fullscreen: bool,

    /// Hide the controls after this many milliseconds without activity
    #[arg(long = "hide-after", value_name = "MS")]
    pub hide_after_ms: Option<u64>,

    /// Enable debug logging to file (default: tapedeck.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}

impl Args {
    /// Apply command-line overrides on top of persisted settings
    pub fn apply_to(&self, settings: &mut crate::config::PlayerSettings) {
        if self.autoplay {
            settings.autoplay = true;
        }
        if self.fullscreen {
            settings.start_fullscreen = true;
        }
        if let Some(ms) = self.hide_after_ms {
            settings.controls_hide_ms = ms;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlayerSettings;

    #[test]
    fn test_parse_files_and_flags() {
        let args = Args::try_parse_from(["tapedeck", "-a", "--hide-after", "1500", "a.mp4", "b.mp3"])
            .unwrap();
        assert_eq!(args.files, vec![PathBuf::from("a.mp4"), PathBuf::from("b.mp3")]);
        assert!(args.autoplay);
        assert_eq!(args.hide_after_ms, Some(1500));
    }

    #[test]
    fn test_verbosity_and_log() {
        let args = Args::try_parse_from(["tapedeck", "-vv", "--log"]).unwrap();
        assert_eq!(args.verbosity, 2);
        assert_eq!(args.log_file, Some(None));
    }

    #[test]
    fn test_overrides_settings() {
        let args = Args::try_parse_from(["tapedeck", "--fullscreen", "--hide-after", "500"]).unwrap();
        let mut settings = PlayerSettings::default();
        args.apply_to(&mut settings);
        assert!(settings.start_fullscreen);
        assert!(!settings.autoplay);
        assert_eq!(settings.controls_hide_ms, 500);
    }
}
