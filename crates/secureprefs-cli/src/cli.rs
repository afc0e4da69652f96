use clap::{Parser, Subcommand};

/// CLI surface definition: the five storage operations plus the
/// operational extras (health, config, version).
#[derive(Parser, Debug)]
#[command(
    name = "secureprefs",
    about = "Encrypted key-value preference storage",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store a value under a key (overwrites any existing entry).
    Set { key: String, value: String },
    /// Print the value stored under a key.
    Get { key: String },
    /// Remove a key and its value.
    Remove { key: String },
    /// Remove every entry in the namespace.
    Clear,
    /// Report whether the device has a lock-screen credential configured.
    Protected,
    /// Run a health check against the preference store.
    Health,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version and exit.
    Version,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_set_subcommand() {
        let cli =
            Cli::try_parse_from(["secureprefs", "set", "token", "abc123"]).expect("parse");
        assert_eq!(
            cli.command,
            Command::Set {
                key: "token".into(),
                value: "abc123".into()
            }
        );
    }

    #[test]
    fn parses_get_subcommand() {
        let cli = Cli::try_parse_from(["secureprefs", "get", "token"]).expect("parse");
        assert_eq!(
            cli.command,
            Command::Get {
                key: "token".into()
            }
        );
    }

    #[test]
    fn parses_health_subcommand() {
        let cli = Cli::try_parse_from(["secureprefs", "health"]).expect("parse");
        assert_eq!(cli.command, Command::Health);
    }

    #[test]
    fn parses_config_init_subcommand() {
        let cli = Cli::try_parse_from(["secureprefs", "config", "init"]).expect("parse");
        assert_eq!(cli.command, Command::Config(ConfigCommand::Init));
    }

    #[test]
    fn rejects_missing_subcommand() {
        assert!(Cli::try_parse_from(["secureprefs"]).is_err());
    }
}
