//! Bot facade
//!
//! Owns the handler registry and wires authentication, the connection
//! manager, and the dispatcher together.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use narvii_api::HttpClient;
use narvii_common::{BotConfig, BotError, BotResult};
use narvii_core::{RequestGateway, SocketFrame, UserProfile};
use tokio::task::JoinSet;

use crate::connection::{Connection, ConnectionManager};
use crate::context::Context;
use crate::dispatch::{EventDispatcher, PendingResponses};
use crate::handlers::{
    BackgroundTask, CommandArgs, CommandSpec, HandlerRegistry, KindFilter, RegistrationResult,
};

/// Pause before restarting a background task that failed
const BACKGROUND_RESTART_DELAY: Duration = Duration::from_secs(1);

/// A chat bot: register handlers, then [`Bot::run`]
pub struct Bot {
    config: BotConfig,
    gateway: Arc<dyn RequestGateway>,
    registry: HandlerRegistry,
    connection: Arc<Connection>,
    waiter: Arc<PendingResponses>,
}

impl Bot {
    /// Create a bot that talks to the platform through `gateway`
    pub fn new(config: BotConfig, gateway: Arc<dyn RequestGateway>) -> Self {
        let registry = HandlerRegistry::new(config.prefix.clone());
        Self {
            config,
            gateway,
            registry,
            connection: Connection::new(),
            waiter: Arc::new(PendingResponses::new()),
        }
    }

    /// Create a bot backed by the HTTP client
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built from `config`
    pub fn from_config(config: BotConfig) -> BotResult<Self> {
        let client = HttpClient::from_config(&config)?;
        Ok(Self::new(config, Arc::new(client)))
    }

    #[must_use]
    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    #[must_use]
    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Outstanding waits; handles may be kept and used while the bot runs
    #[must_use]
    pub fn waiter(&self) -> &Arc<PendingResponses> {
        &self.waiter
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Run `callback` for every chat message accepted by `filter`
    pub fn event<F, Fut>(&mut self, filter: KindFilter, callback: F) -> &mut Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.registry.register_event(filter, callback);
        self
    }

    /// Register a command
    ///
    /// # Errors
    /// Fails if a command string is empty or already registered
    pub fn command<F, Fut>(&mut self, spec: CommandSpec, callback: F) -> RegistrationResult<&mut Self>
    where
        F: Fn(Context, CommandArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.registry.register_command(spec, callback)?;
        Ok(self)
    }

    /// Run `callback` with the bot's profile after every successful connect
    pub fn on_ready<F, Fut>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(UserProfile) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.registry.register_ready(callback);
        self
    }

    /// Run `callback` when the bot is mentioned or replied to
    pub fn on_mention<F, Fut>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.registry.register_mention(callback);
        self
    }

    /// Run `callback` in a loop for as long as the bot runs
    pub fn background_task<F, Fut>(&mut self, name: impl Into<String>, callback: F) -> &mut Self
    where
        F: Fn(Arc<dyn RequestGateway>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.registry.register_background(name, callback);
        self
    }

    /// Wait for the first frame satisfying `predicate`
    ///
    /// # Errors
    /// Returns `BotError::Timeout` if no matching frame arrives in time
    pub async fn wait_for<P>(&self, predicate: P, timeout: Option<Duration>) -> BotResult<SocketFrame>
    where
        P: Fn(&SocketFrame) -> bool + Send + Sync + 'static,
    {
        self.waiter.wait_for(predicate, timeout).await
    }

    // =========================================================================
    // Running
    // =========================================================================

    /// Run until Ctrl-C
    ///
    /// # Errors
    /// Returns an error if authentication fails or the listen loop hits a
    /// non-recoverable error
    pub async fn run(self) -> BotResult<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run until `shutdown` completes
    ///
    /// # Errors
    /// Returns an error if authentication fails or the listen loop hits a
    /// non-recoverable error
    pub async fn run_until<S>(self, shutdown: S) -> BotResult<()>
    where
        S: Future<Output = ()>,
    {
        let Self {
            config,
            gateway,
            registry,
            connection,
            waiter,
        } = self;

        let manager =
            ConnectionManager::new(&config, Arc::clone(&gateway), Arc::clone(&connection))?;
        let profile = manager.authenticate().await?;
        let self_id = gateway
            .session()
            .map(|session| session.user_id)
            .or_else(|| profile.uid.clone())
            .ok_or_else(|| BotError::internal(anyhow::anyhow!("authenticated without a user id")))?;

        tracing::info!(
            user_id = %self_id,
            nickname = profile.nickname.as_deref().unwrap_or_default(),
            "Authenticated"
        );

        let registry = Arc::new(registry);
        let dispatcher = EventDispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&gateway),
            Arc::clone(&connection),
            waiter,
            self_id,
        );

        let mut background = JoinSet::new();
        for task in registry.background() {
            background.spawn(run_background(task.clone(), Arc::clone(&gateway)));
        }

        let result = tokio::select! {
            result = manager.run(&dispatcher, || dispatcher.fire_ready(profile.clone())) => result,
            () = shutdown => {
                tracing::info!("Shutdown requested");
                Ok(())
            }
        };

        connection.close();
        background.abort_all();
        while background.join_next().await.is_some() {}

        if !dispatcher.drain(config.shutdown_grace).await {
            tracing::warn!(
                grace_ms = u64::try_from(config.shutdown_grace.as_millis()).unwrap_or(u64::MAX),
                "Abandoning handler tasks"
            );
        }

        tracing::info!("Goodbye");
        result
    }
}

/// Restart a background task whenever it returns
async fn run_background(task: BackgroundTask, gateway: Arc<dyn RequestGateway>) {
    tracing::debug!(task = %task.name, "Background task started");
    loop {
        if let Err(e) = (task.callback)(Arc::clone(&gateway)).await {
            tracing::error!(task = %task.name, error = ?e, "Background task failed");
            tokio::time::sleep(BACKGROUND_RESTART_DELAY).await;
        }
    }
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("env", &self.config.env)
            .field("registry", &self.registry)
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}
