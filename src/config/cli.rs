use clap::Parser;

#[derive(Parser, Clone, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Set the log level to one of trace, debug, info, warn, or error.
    /// `-v` is shorthand for enabling verbose (trace) logging.
    #[arg(short = 'v',
        long,
        default_missing_value = "trace",
        num_args = 0..=1,
        require_equals = true,
        value_parser = parse_log_level
    )]
    pub log_level: Option<log::LevelFilter>,

    /// Address to listen on, defaults to 0.0.0.0
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on, defaults to 2222
    #[arg(long)]
    pub port: Option<u16>,

    /// Base directory for corpus files, captures, and the sandbox
    /// filesystems. Defaults to `/var/lib/sshtrap`
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Do not load config files.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub no_config: bool,
}

fn parse_log_level(s: &str) -> Result<log::LevelFilter, String> {
    s.parse::<log::LevelFilter>().map_err(|e| e.to_string())
}
