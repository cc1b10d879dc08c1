//! [`Args`] definitions.

use clap::Parser;

/// Authentication server for user registration, login and session
/// verification.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the TOML configuration file.
    ///
    /// Missing file is not an error: defaults and `CONF.*` environment
    /// variables are used instead.
    #[arg(short, long, env = "AUTH_CONFIG", default_value = "config.toml")]
    pub config: String,
}

impl Args {
    /// Parses command line arguments of the current process.
    ///
    /// # Errors
    ///
    /// Errors if the arguments are malformed.
    pub fn parse() -> Result<Self, clap::Error> {
        <Self as Parser>::try_parse()
    }
}

#[cfg(test)]
mod spec {
    use clap::Parser as _;

    use super::Args;

    #[test]
    fn reads_config_path() {
        let args = Args::try_parse_from(["auth", "-c", "prod.toml"]).unwrap();
        assert_eq!(args.config, "prod.toml");

        let args =
            Args::try_parse_from(["auth", "--config", "dev.toml"]).unwrap();
        assert_eq!(args.config, "dev.toml");
    }

    #[test]
    fn rejects_unknown_flags() {
        assert!(Args::try_parse_from(["auth", "--verbose"]).is_err());
    }
}
