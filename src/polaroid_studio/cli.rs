//! CLI parser
use std::num::NonZeroU16;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::filter::FilterKind;
use crate::infrastructure::caption_client::DEFAULT_PROXY_URL;
use crate::infrastructure::gemini_client::{DEFAULT_BASE_URL, DEFAULT_MODEL};

#[derive(Parser, Debug)]
#[clap(version, about = "Polaroid-style photo frames with AI captions")]
pub struct CliOptions {
    #[clap(long, global = true, env = "POLAROID_DEBUG")]
    /// Enable debug logging. Env: POLAROID_DEBUG
    pub debug: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the caption proxy.
    Serve(ServeOptions),
    /// Build a polaroid frame from a local image.
    Compose(ComposeOptions),
}

#[derive(Args, Debug)]
pub struct ServeOptions {
    #[clap(long, short, default_value = "0.0.0.0", env = "POLAROID_LISTEN_ADDRESS")]
    /// Listen address. Env: POLAROID_LISTEN_ADDRESS
    pub listen_address: String,

    #[clap(long, short, default_value = "3300", env = "POLAROID_PORT")]
    /// Env: POLAROID_PORT
    pub port: NonZeroU16,

    #[clap(long, env = "GEMINI_API_KEYS", value_delimiter = ',')]
    /// Comma separated Gemini keys, tried in order. Env: GEMINI_API_KEYS
    pub api_keys: Vec<String>,

    #[clap(long, env = "GEMINI_API_KEY")]
    /// Single key, appended after `--api-keys`. Env: GEMINI_API_KEY
    pub api_key: Option<String>,

    #[clap(long, default_value = DEFAULT_MODEL, env = "GEMINI_MODEL")]
    pub model: String,

    #[clap(long, default_value = DEFAULT_BASE_URL, env = "GEMINI_BASE_URL")]
    pub upstream_base_url: String,

    #[clap(long)]
    /// Directory served for every path the API does not claim.
    pub static_dir: Option<PathBuf>,
}

impl ServeOptions {
    pub fn configured_keys(&self) -> Vec<String> {
        self.api_keys.iter().chain(self.api_key.iter()).cloned().collect()
    }
}

#[derive(Args, Debug)]
pub struct ComposeOptions {
    /// Photo to frame (any format the image crate can guess).
    pub input: PathBuf,

    #[clap(long, default_value = "none")]
    /// none, classic, vintage, bw or vibrant
    pub filter: FilterKind,

    #[clap(long, default_value = "0")]
    pub noise: u32,

    #[clap(long, default_value = "")]
    pub caption: String,

    #[clap(long)]
    /// Ask the caption proxy for a caption; replaces `--caption`.
    pub auto_caption: bool,

    #[clap(long, default_value = DEFAULT_PROXY_URL, env = "POLAROID_PROXY_URL")]
    pub proxy_url: String,

    #[clap(long, default_value = "en")]
    /// `en` or `id`
    pub language: String,

    #[clap(long, default_value = ".")]
    /// Directory that receives `polaroid.png`.
    pub output_dir: PathBuf,

    #[clap(long, env = "POLAROID_FONT")]
    /// TrueType font for the caption. Falls back to common system fonts.
    pub font: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_arguments() {
        let cli = CliOptions::try_parse_from([
            "polaroid_studio",
            "compose",
            "lake.jpg",
            "--filter",
            "vintage",
            "--noise",
            "20",
            "--caption",
            "Sunday",
        ])
        .unwrap();
        let Command::Compose(options) = cli.command else {
            panic!("expected compose");
        };
        assert_eq!(options.filter, FilterKind::Vintage);
        assert_eq!(options.noise, 20);
        assert_eq!(options.output_dir, PathBuf::from("."));
        assert!(!options.auto_caption);
    }

    #[test]
    fn test_unknown_filter_is_rejected() {
        let result = CliOptions::try_parse_from(["polaroid_studio", "compose", "a.png", "--filter", "sepia"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_single_key_is_appended() {
        let cli = CliOptions::try_parse_from([
            "polaroid_studio",
            "serve",
            "--api-keys",
            "one,two",
            "--api-key",
            "three",
        ])
        .unwrap();
        let Command::Serve(options) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(options.configured_keys(), vec!["one", "two", "three"]);
        assert_eq!(options.port.get(), 3300);
    }
}
