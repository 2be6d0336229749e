//! Command handlers.
//!
//! `App` wires the core pieces together: the configured session storage,
//! one shared `SessionStore`, the `AuthGateway` around it, and the
//! `RouteGuard` every view command consults before fetching anything.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Local;
use tracing::{debug, info, warn};
use watchpost_core::auth::{FileStore, KeyValueStore, KeyringStore, MemoryStore};
use watchpost_core::config::SessionBackend;
use watchpost_core::{
    ApiError, AuthGateway, Config, HttpClient, MonitorClient, Navigation, Outcome, Route,
    RouteGuard, SessionStore,
};

use crate::cli::Command;
use crate::view;

pub struct App {
    config: Config,
    gateway: Arc<AuthGateway>,
    monitor: MonitorClient,
    guard: RouteGuard,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let storage = open_storage(&config)?;
        let session = Arc::new(SessionStore::load(storage));
        let http = HttpClient::new(&config).context("Failed to build HTTP client")?;
        let gateway = Arc::new(AuthGateway::new(http, session.clone()));

        Ok(Self {
            monitor: MonitorClient::new(gateway.clone()),
            guard: RouteGuard::new(session),
            gateway,
            config,
        })
    }

    pub async fn run(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Login { username, password } => self.login(username, password).await,
            Command::Register { username, password } => self.register(username, password).await,
            Command::Logout => self.logout(),
            Command::Whoami => self.whoami().await,
            Command::Refresh => self.refresh().await,
            Command::Dashboard => self.dashboard().await,
            Command::Machine { ip } => self.machine(ip).await,
            Command::History { ip } => self.history(ip).await,
            Command::Watch { interval_ms } => {
                let interval = interval_ms
                    .map(Duration::from_millis)
                    .unwrap_or_else(|| self.config.refresh_interval());
                self.watch(interval).await
            }
            Command::Navigate { path } => self.navigate(&path),
        }
    }

    /// Run the guard for a view. A redirect is reported and turned into an
    /// error so the process exits non-zero.
    fn enter(&self, route: &Route) -> Result<()> {
        match self.guard.check(route) {
            Navigation::Proceed => Ok(()),
            Navigation::Redirect(Route::Login) => {
                bail!("Not logged in. Run `watchpost login` first.")
            }
            Navigation::Redirect(target) => {
                let who = self.gateway.session().username().unwrap_or_default();
                bail!(
                    "Already logged in as {}. Showing {} instead; run `watchpost logout` to switch accounts.",
                    who,
                    target
                )
            }
        }
    }

    async fn login(&mut self, username: Option<String>, password: Option<String>) -> Result<()> {
        self.enter(&Route::Login)?;

        let username = match username.or_else(|| self.config.last_username.clone()) {
            Some(u) => u,
            None => prompt("Username: ")?,
        };
        let password = match password {
            Some(p) => p,
            None => rpassword::prompt_password("Password: ").context("Failed to read password")?,
        };

        let outcome = self.gateway.login(&username, &password).await;
        report(&outcome)?;

        self.config.last_username = Some(username.clone());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to remember username");
        }
        info!(username = %username, "Logged in");
        println!("Logged in as {}", username);
        Ok(())
    }

    async fn register(&self, username: String, password: Option<String>) -> Result<()> {
        self.enter(&Route::Register)?;

        let password = match password {
            Some(p) => p,
            None => {
                let first = rpassword::prompt_password("Password: ")
                    .context("Failed to read password")?;
                let again = rpassword::prompt_password("Repeat password: ")
                    .context("Failed to read password")?;
                if first != again {
                    bail!("Passwords do not match");
                }
                first
            }
        };

        report(&self.gateway.register(&username, &password).await)?;
        println!("Registered {}. Run `watchpost login {}` to sign in.", username, username);
        Ok(())
    }

    fn logout(&self) -> Result<()> {
        let was = self.gateway.session().username();
        report(&self.gateway.logout())?;
        match was {
            Some(u) => println!("Logged out {}", u),
            None => println!("No session was stored"),
        }
        Ok(())
    }

    async fn whoami(&self) -> Result<()> {
        let Some(username) = self.gateway.session().username() else {
            bail!("Not logged in. Run `watchpost login` first.");
        };
        println!("Stored session: {}", username);

        let outcome = self.gateway.current_user_info().await;
        report(&outcome)?;
        if let Some(data) = outcome.data() {
            println!("{}", view::render(data));
        }
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        report(&self.gateway.refresh_access_token().await)?;
        println!("Access token refreshed");
        Ok(())
    }

    async fn dashboard(&self) -> Result<()> {
        self.enter(&Route::Dashboard)?;
        self.draw_dashboard().await
    }

    async fn draw_dashboard(&self) -> Result<()> {
        let started = std::time::Instant::now();
        let (latest, overview, statistics) = futures::join!(
            self.monitor.latest_metrics(),
            self.monitor.system_overview(),
            self.monitor.statistics()
        );
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Dashboard fetched");

        view::section("System overview", &overview);
        view::section("Statistics", &statistics);
        view::section("Latest metrics", &latest);

        for result in [&latest, &overview, &statistics] {
            if let Err(e) = result {
                expired_hint(e)?;
            }
        }
        Ok(())
    }

    async fn machine(&self, ip: String) -> Result<()> {
        self.enter(&Route::MachineDetail { ip: ip.clone() })?;

        let (detail, complete) = futures::join!(
            self.monitor.machine_detail(&ip),
            self.monitor.complete_by_ip(&ip)
        );
        view::section(&format!("Machine {}", ip), &detail);
        view::section("Complete record", &complete);
        for result in [&detail, &complete] {
            if let Err(e) = result {
                expired_hint(e)?;
            }
        }
        Ok(())
    }

    async fn history(&self, ip: String) -> Result<()> {
        self.enter(&Route::MachineHistory { ip: ip.clone() })?;

        let history = self.monitor.machine_history(&ip).await;
        view::section(&format!("History for {}", ip), &history);
        if let Err(e) = &history {
            expired_hint(e)?;
        }
        Ok(())
    }

    async fn watch(&self, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            bail!("Refresh interval must be greater than zero");
        }
        self.enter(&Route::Dashboard)?;
        info!(interval_ms = interval.as_millis() as u64, "Watching dashboard");

        let mut ticker = tokio::time::interval(interval);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Session may have been cleared from another process
                    self.enter(&Route::Dashboard)?;
                    println!("--- {} ---", Local::now().format("%Y-%m-%d %H:%M:%S"));
                    self.draw_dashboard().await?;
                }
                _ = &mut ctrl_c => {
                    info!("Watch interrupted");
                    return Ok(());
                }
            }
        }
    }

    fn navigate(&self, path: &str) -> Result<()> {
        let Some(route) = Route::parse(path) else {
            bail!("No view at {}", path);
        };
        match self.guard.check(&route) {
            Navigation::Proceed => println!("{} ({}): proceed", route, route.name()),
            Navigation::Redirect(to) => println!("{} ({}): redirect to {}", route, route.name(), to),
        }
        Ok(())
    }
}

fn open_storage(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
    let storage: Arc<dyn KeyValueStore> = match config.session_backend {
        SessionBackend::File => Arc::new(FileStore::new(&config.data_dir()?)),
        SessionBackend::Keyring => Arc::new(KeyringStore::new()),
        SessionBackend::Memory => Arc::new(MemoryStore::new()),
    };
    debug!(backend = ?config.session_backend, "Session storage opened");
    Ok(storage)
}

fn report(outcome: &Outcome) -> Result<()> {
    match outcome {
        Outcome::Success { .. } => Ok(()),
        Outcome::Failure { message } => bail!("{}", message),
    }
}

/// An unauthorized response that survived the refresh-retry means the
/// session is gone for good.
fn expired_hint(err: &ApiError) -> Result<()> {
    if err.is_unauthorized() {
        bail!("Session expired. Run `watchpost login` again.");
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let value = line.trim().to_string();
    if value.is_empty() {
        bail!("A value is required");
    }
    Ok(value)
}
