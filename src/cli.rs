use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hyperfetch")]
#[command(version)]
#[command(about = "Fetch files and listings from hyperdrive archives", long_about = None)]
#[command(after_help = "Examples:\n  \
  hyperfetch --root drives hyper://blog/index.html     print a file\n  \
  hyperfetch --root drives -r 0-99 hyper://blog/a.bin  first 100 bytes\n  \
  hyperfetch -i https://example.com/                   plain HTTP passthrough")]
pub struct Cli {
    /// Archive URL, HTTP URL, or path relative to --base
    #[arg(value_name = "URL")]
    pub url: String,

    /// Request method
    #[arg(short = 'X', long = "request", value_name = "METHOD", default_value = "GET")]
    pub method: String,

    /// Extra request header, `Name: value` (repeatable)
    #[arg(short = 'H', long = "header", value_name = "HEADER")]
    pub headers: Vec<String>,

    /// Byte range to request, e.g. `0-99` or `-100`
    #[arg(short = 'r', long = "range", value_name = "RANGE")]
    pub range: Option<String>,

    /// Send a HEAD request
    #[arg(short = 'I', long = "head")]
    pub head: bool,

    /// Print status line and response headers
    #[arg(short = 'i', long = "include")]
    pub include: bool,

    /// Directory whose sub-directories are served as archives
    #[arg(long = "root", value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// Base URL for scheme-less URLs
    #[arg(long = "base", value_name = "URL")]
    pub base: Option<String>,

    /// Verbose logging (-vv => trace)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn method(&self) -> &str {
        if self.head { "HEAD" } else { &self.method }
    }

    /// Split `Name: value` header arguments
    pub fn parsed_headers(&self) -> impl Iterator<Item = Option<(&str, &str)>> {
        self.headers
            .iter()
            .map(|h| h.split_once(':').map(|(name, value)| (name.trim(), value.trim())))
    }

    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_request_options() {
        let cli = Cli::parse_from([
            "hyperfetch",
            "-H",
            "Accept: text/html",
            "-r",
            "0-4",
            "-vv",
            "hyper://abc/file.txt",
        ]);
        assert_eq!(cli.url, "hyper://abc/file.txt");
        assert_eq!(cli.method(), "GET");
        assert_eq!(cli.range.as_deref(), Some("0-4"));
        assert_eq!(
            cli.parsed_headers().collect::<Vec<_>>(),
            vec![Some(("Accept", "text/html"))]
        );
        assert_eq!(cli.log_filter(), "trace");
    }

    #[test]
    fn head_flag_overrides_method() {
        let cli = Cli::parse_from(["hyperfetch", "-I", "-X", "POST", "hyper://abc/"]);
        assert_eq!(cli.method(), "HEAD");
    }
}
