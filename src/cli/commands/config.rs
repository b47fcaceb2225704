use clap::Args;

/// Logging configuration that can be set via CLI or env vars.
///
/// The `[logging]` section of the configuration file supplies the level when
/// neither is given.
#[derive(Debug, Clone, Default, Args)]
pub struct LoggingConfig {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log-level", env = "SALESDASH_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log filter directives
    #[arg(long = "log-filter", env = "SALESDASH_LOG_FILTER")]
    pub log_filter: Option<String>,
}

impl LoggingConfig {
    pub fn get_effective_level(&self) -> &str {
        self.get_effective_level_or("info")
    }

    /// Like [`get_effective_level`](Self::get_effective_level), with
    /// `configured` standing in when neither a flag nor a level is given.
    pub fn get_effective_level_or<'a>(&'a self, configured: &'a str) -> &'a str {
        match (self.verbose, self.log_level.as_deref()) {
            (v, _) if v >= 2 => "trace", // -vv flag
            (1, _) => "debug",           // -v flag
            (0, Some(level)) => level,   // Configured level
            _ => configured,
        }
    }
}
