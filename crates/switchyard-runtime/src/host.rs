//! Host orchestration.
//!
//! A [`SwitchyardHost`] owns a built [`Dispatcher`] and the background sweeper that
//! expires idle runtimes. The gateway connection is the embedder's business: it
//! hands every inbound interaction to [`SwitchyardHost::handle`] and forwards the
//! replies collected by its [`ReplySink`](switchyard_framework::ReplySink).
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use switchyard_runtime::SwitchyardHost;
//!
//! let dispatcher = Dispatcher::builder(registry)
//!     .instances(controllers)
//!     .reply_sink(sink);
//!
//! // Loads switchyard.toml and SWITCHYARD_* variables, then initializes logging.
//! let host = SwitchyardHost::builder().profile("production").build(dispatcher)?;
//!
//! host.start();
//! gateway.for_each(|interaction| host.handle(interaction));
//! host.run().await?;
//! ```

use std::future::Future;

use parking_lot::Mutex;
use switchyard_core::Interaction;
use switchyard_framework::{DispatchOutcome, Dispatcher, DispatcherBuilder, RuntimeStats};
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigLoader, SwitchyardConfig, validate_config};
use crate::error::RuntimeResult;
use crate::logging;

struct Sweeper {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Runs a [`Dispatcher`] together with its runtime sweeper.
pub struct SwitchyardHost {
    config: SwitchyardConfig,
    dispatcher: Dispatcher,
    sweeper: Mutex<Option<Sweeper>>,
}

impl SwitchyardHost {
    /// Finishes `dispatcher` with the expiration policy from `config`.
    pub fn new(dispatcher: DispatcherBuilder, config: SwitchyardConfig) -> RuntimeResult<Self> {
        validate_config(&config)?;
        let dispatcher = dispatcher.expiration(config.expiration.to_policy()).build()?;

        info!(
            policy = ?config.expiration.policy,
            inactivity_minutes = config.expiration.inactivity_minutes,
            definitions = dispatcher.registry().len(),
            "Switchyard host created"
        );

        Ok(Self {
            config,
            dispatcher,
            sweeper: Mutex::new(None),
        })
    }

    pub fn builder() -> HostBuilder {
        HostBuilder::new()
    }

    pub fn config(&self) -> &SwitchyardConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn stats(&self) -> RuntimeStats {
        self.dispatcher.runtimes().stats()
    }

    pub fn is_running(&self) -> bool {
        self.sweeper.lock().is_some()
    }

    /// Spawns the sweeper. Must be called from within a Tokio runtime.
    pub fn start(&self) {
        let mut sweeper = self.sweeper.lock();
        if sweeper.is_some() {
            warn!("Switchyard host is already running");
            return;
        }

        let token = CancellationToken::new();
        let handle = self
            .dispatcher
            .runtimes()
            .spawn_sweeper(self.config.expiration.sweep_interval(), token.clone());
        *sweeper = Some(Sweeper { token, handle });
        info!("Switchyard host started");
    }

    /// Stops the sweeper and waits for it to finish.
    ///
    /// Live runtimes are left in place; a later [`start`](Self::start) resumes
    /// expiring them.
    pub async fn stop(&self) -> RuntimeResult<()> {
        let Some(Sweeper { token, handle }) = self.sweeper.lock().take() else {
            debug!("Switchyard host is not running");
            return Ok(());
        };

        token.cancel();
        handle.await?;

        let stats = self.stats();
        info!(
            live = stats.live,
            created = stats.created,
            closed = stats.closed,
            expired = stats.expired,
            "Switchyard host stopped"
        );
        Ok(())
    }

    /// Dispatches one interaction on the current task.
    pub async fn dispatch(&self, interaction: Interaction) -> DispatchOutcome {
        self.dispatcher.dispatch(interaction).await
    }

    /// Dispatches one interaction on its own task.
    pub fn handle(&self, interaction: Interaction) -> JoinHandle<DispatchOutcome> {
        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move { dispatcher.dispatch(interaction).await })
    }

    /// Starts the host and runs until Ctrl+C or SIGTERM.
    pub async fn run(&self) -> RuntimeResult<()> {
        self.run_until(wait_for_shutdown()).await
    }

    /// Starts the host and runs until `shutdown` resolves.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        self.start();
        shutdown.await;
        self.stop().await
    }
}

impl Drop for SwitchyardHost {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.get_mut().take() {
            sweeper.token.cancel();
        }
    }
}

impl std::fmt::Debug for SwitchyardHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwitchyardHost")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    result = signal::ctrl_c() => {
                        if let Err(e) = result {
                            error!(error = %e, "Failed to listen for Ctrl+C");
                        }
                        info!("Received Ctrl+C, shutting down");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down");
                    }
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to register SIGTERM handler"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl+C"),
    }
}

// =============================================================================
// HostBuilder
// =============================================================================

/// Loads configuration, sets up logging and creates a [`SwitchyardHost`].
pub struct HostBuilder {
    config_loader: ConfigLoader,
    init_logging: bool,
}

impl HostBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            init_logging: true,
        }
    }

    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    pub fn merge(mut self, config: SwitchyardConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Leaves the global subscriber alone, for embedders that install their own.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    pub fn build(self, dispatcher: DispatcherBuilder) -> RuntimeResult<SwitchyardHost> {
        let config = self.config_loader.load()?;
        if self.init_logging {
            logging::init_from_config(&config.logging);
        }
        SwitchyardHost::new(dispatcher, config)
    }
}

impl Default for HostBuilder {
    fn default() -> Self {
        Self::new()
    }
}
