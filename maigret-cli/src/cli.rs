use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "maigret",
    version,
    about = "Find accounts by username across social networks",
    long_about = "maigret checks one or more usernames against a catalog of thousands of \
                  sites and reports where a profile exists."
)]
pub struct Cli {
    /// Usernames to look up
    #[arg(required_unless_present_any = ["test", "download"])]
    pub usernames: Vec<String>,

    /// Disable colored output
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Download a fresh site catalog before running
    #[arg(long = "update")]
    pub update: bool,

    /// Route probes through the SOCKS5 proxy (Tor)
    #[arg(short = 't', long = "tor")]
    pub tor: bool,

    /// Take a screenshot of every found profile
    #[arg(short = 's', long = "screenshot")]
    pub screenshot: bool,

    /// Show not-found and failed sites, and debug logs
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Download content of found profiles; without usernames, list supported sites
    #[arg(short = 'd', long = "download")]
    pub download: bool,

    /// Site catalog file
    #[arg(long = "database", value_name = "DATABASE")]
    pub database: Option<PathBuf>,

    /// Only probe this site
    #[arg(long = "site", value_name = "SITE")]
    pub site: Option<String>,

    /// Check every catalog entry against its known usernames
    #[arg(long = "test")]
    pub test: bool,
}

impl Cli {
    /// Log filter used when `RUST_LOG` is not set.
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "warn,maigret=debug"
        } else {
            "warn"
        }
    }

    /// Whether found profiles get screenshots in this run.
    pub fn screenshots_enabled(&self) -> bool {
        self.screenshot && !self.test
    }

    /// `--download` given without usernames: list downloaders and exit.
    pub fn lists_downloaders(&self) -> bool {
        self.download && self.usernames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_usernames_and_flags() {
        let cli = Cli::try_parse_from([
            "maigret",
            "alice",
            "bob",
            "--tor",
            "-s",
            "--site",
            "GitHub",
            "--database",
            "sites.json",
        ])
        .expect("valid arguments");

        assert_eq!(cli.usernames, vec!["alice", "bob"]);
        assert!(cli.tor);
        assert!(cli.screenshot);
        assert!(cli.screenshots_enabled());
        assert_eq!(cli.site.as_deref(), Some("GitHub"));
        assert_eq!(cli.database, Some(PathBuf::from("sites.json")));
        assert_eq!(cli.default_log_filter(), "warn");
    }

    #[test]
    fn test_usernames_required_for_scan() {
        assert!(Cli::try_parse_from(["maigret"]).is_err());
        assert!(Cli::try_parse_from(["maigret", "--no-color"]).is_err());
    }

    #[test]
    fn test_test_mode_without_usernames() {
        let cli = Cli::try_parse_from(["maigret", "--test", "-s"]).expect("valid arguments");
        assert!(cli.test);
        assert!(!cli.screenshots_enabled());
    }

    #[test]
    fn test_download_listing() {
        let cli = Cli::try_parse_from(["maigret", "-d"]).expect("valid arguments");
        assert!(cli.lists_downloaders());

        let cli = Cli::try_parse_from(["maigret", "-d", "alice"]).expect("valid arguments");
        assert!(!cli.lists_downloaders());
    }

    #[test]
    fn test_verbose_filter() {
        let cli = Cli::try_parse_from(["maigret", "-v", "alice"]).expect("valid arguments");
        assert_eq!(cli.default_log_filter(), "warn,maigret=debug");
    }
}
