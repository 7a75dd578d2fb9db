use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use dirs::home_dir;

use crate::api::DEFAULT_API_URL;

const DB_FILE: &str = ".hbnb.db3";

/// Settings shared by every command. Each one can also come from the environment.
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Base URL of the HBnB API
    #[arg(long, global = true, env = "HBNB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,
    /// Cookie jar location [default: ~/.hbnb.db3]
    #[arg(long, global = true, env = "HBNB_DB")]
    pub db: Option<PathBuf>,
    /// Most lookups kept in flight at once
    #[arg(
        long,
        global = true,
        env = "HBNB_CONCURRENCY",
        default_value_t = 4,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub concurrency: u16,
    /// Give up on a request after this many seconds (no limit by default)
    #[arg(long, global = true, env = "HBNB_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,
    /// Use this `Cookie:` header instead of the cookie jar to find the session
    #[arg(long, global = true, env = "HBNB_COOKIE")]
    pub cookie: Option<String>,
}

impl Config {
    pub fn db_path(&self) -> Option<PathBuf> {
        match &self.db {
            Some(path) => Some(path.clone()),
            None => home_dir().map(|home| home.join(DB_FILE)),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn concurrency(&self) -> usize {
        usize::from(self.concurrency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        config: Config,
    }

    #[test]
    fn defaults_and_overrides() {
        let cli = Cli::parse_from(["hbnb", "--db", "/tmp/jar.db3"]);
        assert_eq!(cli.config.db_path(), Some(PathBuf::from("/tmp/jar.db3")));
        assert_eq!(cli.config.timeout(), None);

        let cli = Cli::parse_from([
            "hbnb",
            "--api-url",
            "http://api.test/api/v1",
            "--concurrency",
            "8",
            "--timeout-secs",
            "5",
        ]);
        assert_eq!(cli.config.api_url, "http://api.test/api/v1");
        assert_eq!(cli.config.concurrency(), 8);
        assert_eq!(cli.config.timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        assert!(Cli::try_parse_from(["hbnb", "--concurrency", "0"]).is_err());
    }
}
