use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "watchpost", version, about = "Server-monitoring dashboard client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and store the session
    Login {
        /// Defaults to the last username that logged in
        username: Option<String>,
        #[arg(long, env = "WATCHPOST_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create an account (does not log in)
    Register {
        username: String,
        #[arg(long, env = "WATCHPOST_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the logged-in user as the server sees it
    Whoami,
    /// Exchange the refresh token for a new access token
    Refresh,
    /// Latest metrics, system overview and statistics
    Dashboard,
    /// Latest metrics for one machine
    Machine { ip: String },
    /// Recent samples for one machine
    History { ip: String },
    /// Redraw the dashboard on every refresh interval until Ctrl-C
    Watch {
        /// Overrides the configured refresh interval
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// Show where the route guard sends a view path
    Navigate { path: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_machine_and_watch() {
        let cli = Cli::parse_from(["watchpost", "machine", "10.0.0.4"]);
        assert!(matches!(cli.command, Command::Machine { ref ip } if ip == "10.0.0.4"));

        let cli = Cli::parse_from(["watchpost", "watch", "--interval-ms", "500"]);
        assert!(matches!(cli.command, Command::Watch { interval_ms: Some(500) }));
    }

    #[test]
    fn test_login_username_is_optional() {
        let cli = Cli::parse_from(["watchpost", "login"]);
        assert!(matches!(cli.command, Command::Login { username: None, .. }));
    }
}
