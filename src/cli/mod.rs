use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod interactive;

#[derive(Parser)]
#[command(
    name = "now-gist",
    about = "Now Gist - Turn Now News links into a text gist and an MP3",
    version,
    long_about = "Paste a Now News (news.now.com) link to download its audio with yt-dlp + ffmpeg and get a short gist with title, publish time and link. Speech-to-text through faster-whisper is optional."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (defaults to ./config.yaml or the user config directory)
    #[arg(long, global = true, env = "NOW_GIST_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download audio with yt-dlp and print the gist
    Gist {
        /// Now News link
        #[arg(value_name = "URL")]
        url: String,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format (defaults to app.default_output_format)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Fill the gist body with speech-to-text (slow)
        #[arg(long)]
        transcribe: bool,

        /// Save the mp3 into DIR (current directory if DIR is omitted)
        #[arg(long, value_name = "DIR", num_args = 0..=1, default_missing_value = ".")]
        save_audio: Option<PathBuf>,

        /// Print selected yt-dlp metadata after the gist
        #[arg(long)]
        debug: bool,
    },

    /// Transcode the HLS stream behind a newsId link straight to mp3
    Audio {
        /// Now News link containing newsId=<digits>
        #[arg(value_name = "URL")]
        url: String,

        /// Directory for now_<id>.mp3
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        output: PathBuf,

        /// Kill ffmpeg after this many seconds (overrides config)
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },

    /// Show the manifest URL derived from a newsId link
    Resolve {
        /// Now News link containing newsId=<digits>
        #[arg(value_name = "URL")]
        url: String,

        /// Send a HEAD request to see whether the manifest exists
        #[arg(long)]
        check: bool,
    },

    /// Paste links one after another; results stay available until cleared
    Interactive {
        /// Start with speech-to-text enabled
        #[arg(long)]
        transcribe: bool,
    },

    /// Show or locate configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// Check that yt-dlp, ffmpeg and the speech-to-text tool can be run
    Check,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// The gist text block
    Text,
    /// JSON with gist, transcript and metadata
    Json,
}

impl OutputFormat {
    /// Parse a config value, falling back to text
    pub fn from_config(value: &str) -> Self {
        <Self as ValueEnum>::from_str(value, true).unwrap_or(OutputFormat::Text)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_save_audio_without_dir() {
        let cli = Cli::parse_from(["now-gist", "gist", "https://news.now.com/x", "--save-audio"]);
        match cli.command {
            Commands::Gist { save_audio, transcribe, .. } => {
                assert_eq!(save_audio, Some(PathBuf::from(".")));
                assert!(!transcribe);
            }
            _ => panic!("expected gist"),
        }
    }

    #[test]
    fn test_output_format_from_config() {
        assert!(matches!(OutputFormat::from_config("json"), OutputFormat::Json));
        assert!(matches!(OutputFormat::from_config("JSON"), OutputFormat::Json));
        assert!(matches!(OutputFormat::from_config("srt"), OutputFormat::Text));
    }

    #[test]
    fn test_audio_timeout_flag() {
        let cli = Cli::parse_from(["now-gist", "audio", "u", "--timeout", "30", "-q"]);
        assert!(cli.quiet);
        match cli.command {
            Commands::Audio { timeout, output, .. } => {
                assert_eq!(timeout, Some(30));
                assert_eq!(output, PathBuf::from("."));
            }
            _ => panic!("expected audio"),
        }
    }
}
