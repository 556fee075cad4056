//! Handler registry
//!
//! Owned by one bot instance. Mutated only while registering, then shared
//! read-only with the dispatcher.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use narvii_core::{MediaKind, MessageKind, RequestGateway, UserProfile};

use super::{ArgSpec, CommandArgs, RegistrationError, RegistrationResult};
use crate::context::Context;

/// Boxed future returned by every callback
pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// Event and mention callbacks
pub type EventCallback = Arc<dyn Fn(Context) -> HandlerFuture + Send + Sync>;

/// Command callbacks
pub type CommandCallback = Arc<dyn Fn(Context, CommandArgs) -> HandlerFuture + Send + Sync>;

/// Ready callbacks, given the bot's own profile
pub type ReadyCallback = Arc<dyn Fn(UserProfile) -> HandlerFuture + Send + Sync>;

/// Background callbacks, given a global-scope gateway
pub type BackgroundCallback =
    Arc<dyn Fn(Arc<dyn RequestGateway>) -> HandlerFuture + Send + Sync>;

/// Accepted message and media kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindFilter {
    message_kinds: HashSet<MessageKind>,
    media_kinds: HashSet<MediaKind>,
}

impl Default for KindFilter {
    /// Plain text messages only
    fn default() -> Self {
        Self {
            message_kinds: HashSet::from([MessageKind::TEXT]),
            media_kinds: HashSet::from([MediaKind::TEXT]),
        }
    }
}

impl KindFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the accepted message kinds; an empty list keeps the default
    #[must_use]
    pub fn message_kinds(mut self, kinds: impl IntoIterator<Item = MessageKind>) -> Self {
        let kinds: HashSet<_> = kinds.into_iter().collect();
        if !kinds.is_empty() {
            self.message_kinds = kinds;
        }
        self
    }

    /// Replace the accepted media kinds; an empty list keeps the default
    #[must_use]
    pub fn media_kinds(mut self, kinds: impl IntoIterator<Item = MediaKind>) -> Self {
        let kinds: HashSet<_> = kinds.into_iter().collect();
        if !kinds.is_empty() {
            self.media_kinds = kinds;
        }
        self
    }

    /// Whether both kinds are accepted
    #[must_use]
    pub fn accepts(&self, message_kind: MessageKind, media_kind: MediaKind) -> bool {
        self.message_kinds.contains(&message_kind) && self.media_kinds.contains(&media_kind)
    }
}

/// Command registration options
#[derive(Debug, Clone)]
pub struct CommandSpec {
    commands: Vec<String>,
    description: String,
    filter: KindFilter,
    prefix: Option<String>,
    args: Vec<ArgSpec>,
}

impl CommandSpec {
    /// Spec for one or more command names (without prefix)
    pub fn new<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            commands: commands.into_iter().map(Into::into).collect(),
            description: "No description.".to_string(),
            filter: KindFilter::default(),
            prefix: None,
            args: Vec::new(),
        }
    }

    /// Text replied when the message contains `-h`
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Use this prefix instead of the registry default
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: KindFilter) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn message_kinds(mut self, kinds: impl IntoIterator<Item = MessageKind>) -> Self {
        self.filter = self.filter.message_kinds(kinds);
        self
    }

    #[must_use]
    pub fn media_kinds(mut self, kinds: impl IntoIterator<Item = MediaKind>) -> Self {
        self.filter = self.filter.media_kinds(kinds);
        self
    }

    /// Declare the next argument
    #[must_use]
    pub fn arg(mut self, arg: ArgSpec) -> Self {
        self.args.push(arg);
        self
    }
}

/// A registered event handler
pub struct EventHandler {
    pub name: String,
    pub filter: KindFilter,
    pub callback: EventCallback,
}

/// A registered command handler
pub struct CommandHandler {
    /// Prefixed, lowercased command strings
    pub commands: Vec<String>,
    pub description: String,
    pub filter: KindFilter,
    pub args: Vec<ArgSpec>,
    pub callback: CommandCallback,
}

impl CommandHandler {
    /// Name used in logs
    #[must_use]
    pub fn name(&self) -> &str {
        self.commands.first().map_or("", String::as_str)
    }

    /// First command string `text` starts with
    #[must_use]
    pub fn matching_command(&self, lowered_text: &str) -> Option<&str> {
        self.commands
            .iter()
            .find(|command| lowered_text.starts_with(command.as_str()))
            .map(String::as_str)
    }
}

/// A registered background task
#[derive(Clone)]
pub struct BackgroundTask {
    pub name: String,
    pub callback: BackgroundCallback,
}

/// Registry of every handler a bot dispatches to
#[derive(Default)]
pub struct HandlerRegistry {
    prefix: String,
    events: Vec<EventHandler>,
    commands: Vec<CommandHandler>,
    ready: Option<ReadyCallback>,
    mention: Option<EventCallback>,
    background: Vec<BackgroundTask>,
}

impl HandlerRegistry {
    /// Create a registry with a default command prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().to_lowercase(),
            ..Self::default()
        }
    }

    /// Default command prefix
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register an event handler
    pub fn register_event<F, Fut>(&mut self, filter: KindFilter, callback: F)
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let name = format!("event#{}", self.events.len());
        tracing::debug!(handler = %name, "Event handler registered");

        self.events.push(EventHandler {
            name,
            filter,
            callback: Arc::new(move |ctx| Box::pin(callback(ctx)) as HandlerFuture),
        });
    }

    /// Register a command handler
    ///
    /// # Errors
    /// Fails if any prefixed command is empty or already registered
    pub fn register_command<F, Fut>(
        &mut self,
        spec: CommandSpec,
        callback: F,
    ) -> RegistrationResult<()>
    where
        F: Fn(Context, CommandArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        if spec.commands.is_empty() {
            return Err(RegistrationError::NoCommands);
        }

        let prefix = spec
            .prefix
            .as_deref()
            .map_or_else(|| self.prefix.clone(), str::to_lowercase);

        let mut commands: Vec<String> = Vec::with_capacity(spec.commands.len());
        for command in &spec.commands {
            let command = format!("{prefix}{}", command.to_lowercase());
            if command.is_empty() {
                return Err(RegistrationError::EmptyCommand);
            }
            if commands.contains(&command) || self.is_registered(&command) {
                return Err(RegistrationError::DuplicateCommand(command));
            }
            commands.push(command);
        }

        tracing::debug!(commands = ?commands, args = spec.args.len(), "Command registered");

        self.commands.push(CommandHandler {
            commands,
            description: spec.description,
            filter: spec.filter,
            args: spec.args,
            callback: Arc::new(move |ctx, args| Box::pin(callback(ctx, args)) as HandlerFuture),
        });
        Ok(())
    }

    /// Set the ready callback, replacing any previous one
    pub fn register_ready<F, Fut>(&mut self, callback: F)
    where
        F: Fn(UserProfile) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        if self.ready.is_some() {
            tracing::debug!("Replacing ready callback");
        }
        self.ready = Some(Arc::new(move |profile| {
            Box::pin(callback(profile)) as HandlerFuture
        }));
    }

    /// Set the mention callback, replacing any previous one
    pub fn register_mention<F, Fut>(&mut self, callback: F)
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        if self.mention.is_some() {
            tracing::debug!("Replacing mention callback");
        }
        self.mention = Some(Arc::new(move |ctx| Box::pin(callback(ctx)) as HandlerFuture));
    }

    /// Register a task restarted whenever it returns
    pub fn register_background<F, Fut>(&mut self, name: impl Into<String>, callback: F)
    where
        F: Fn(Arc<dyn RequestGateway>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.background.push(BackgroundTask {
            name: name.into(),
            callback: Arc::new(move |gateway| Box::pin(callback(gateway)) as HandlerFuture),
        });
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Whether a prefixed command string is taken
    #[must_use]
    pub fn is_registered(&self, command: &str) -> bool {
        let command = command.to_lowercase();
        self.commands
            .iter()
            .any(|handler| handler.commands.contains(&command))
    }

    pub fn events(&self) -> &[EventHandler] {
        &self.events
    }

    pub fn commands(&self) -> &[CommandHandler] {
        &self.commands
    }

    pub fn ready(&self) -> Option<&ReadyCallback> {
        self.ready.as_ref()
    }

    pub fn mention(&self) -> Option<&EventCallback> {
        self.mention.as_ref()
    }

    pub fn background(&self) -> &[BackgroundTask] {
        &self.background
    }

    /// First-registered command handler whose command prefixes `text`
    ///
    /// Returns the handler and the matched command string. Registration order
    /// decides ties, not match length.
    #[must_use]
    pub fn match_command(&self, text: &str) -> Option<(&CommandHandler, &str)> {
        let lowered = text.to_lowercase();
        self.commands.iter().find_map(|handler| {
            handler
                .matching_command(&lowered)
                .map(|command| (handler, command))
        })
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("prefix", &self.prefix)
            .field("events", &self.events.len())
            .field(
                "commands",
                &self.commands.iter().map(CommandHandler::name).collect::<Vec<_>>(),
            )
            .field("ready", &self.ready.is_some())
            .field("mention", &self.mention.is_some())
            .field("background", &self.background.len())
            .finish()
    }
}
