//! Event dispatcher
//!
//! Processes one frame at a time, in arrival order. Matching handlers are
//! spawned onto a task tracker and never block the receive loop.

use std::sync::Arc;
use std::time::Duration;

use narvii_common::BotResult;
use narvii_core::{ChatEvent, RequestGateway, SocketFrame, UserProfile};
use tokio_util::task::TaskTracker;

use super::PendingResponses;
use crate::connection::Connection;
use crate::context::Context;
use crate::handlers::{parse_arguments, CommandHandler, HandlerFuture, HandlerRegistry};

/// Substring that turns a command into a help request
const HELP_FLAG: &str = "-h";

/// Why a frame reached no handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Not a chat message; only the waiter saw it
    NotChatMessage,
    /// Written by the bot itself
    SelfAuthored,
}

/// What dispatching one frame did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Pending waits fulfilled by the frame
    pub fulfilled_waits: usize,
    /// Names of the handler tasks spawned
    pub scheduled: Vec<String>,
    pub skipped: Option<SkipReason>,
}

/// Routes frames to the waiter and to registered handlers
pub struct EventDispatcher {
    registry: Arc<HandlerRegistry>,
    gateway: Arc<dyn RequestGateway>,
    connection: Arc<Connection>,
    waiter: Arc<PendingResponses>,
    self_id: String,
    tasks: TaskTracker,
}

impl EventDispatcher {
    /// Create a dispatcher for the account `self_id`
    pub fn new(
        registry: Arc<HandlerRegistry>,
        gateway: Arc<dyn RequestGateway>,
        connection: Arc<Connection>,
        waiter: Arc<PendingResponses>,
        self_id: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            gateway,
            connection,
            waiter,
            self_id: self_id.into(),
            tasks: TaskTracker::new(),
        }
    }

    /// Account id whose messages are never dispatched
    #[must_use]
    pub fn self_id(&self) -> &str {
        &self.self_id
    }

    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    #[must_use]
    pub fn waiter(&self) -> &Arc<PendingResponses> {
        &self.waiter
    }

    /// Number of handler tasks still running
    #[must_use]
    pub fn running_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Decode and dispatch raw socket text
    ///
    /// # Errors
    /// Returns `BotError::Decode` if the text is not a valid frame
    pub fn handle_text(&self, text: &str) -> BotResult<DispatchReport> {
        let frame = SocketFrame::from_json(text)?;
        self.handle_frame(&frame)
    }

    /// Dispatch a decoded frame
    ///
    /// # Errors
    /// Returns `BotError::Decode` if a chat message frame lacks required fields
    pub fn handle_frame(&self, frame: &SocketFrame) -> BotResult<DispatchReport> {
        let mut report = DispatchReport {
            fulfilled_waits: self.waiter.offer(frame),
            ..DispatchReport::default()
        };

        if !frame.kind().is_chat_message() {
            tracing::trace!(frame_kind = %frame.kind(), "Non-chat frame");
            report.skipped = Some(SkipReason::NotChatMessage);
            return Ok(report);
        }

        let event = Arc::new(ChatEvent::from_frame(frame)?);
        if event.is_authored_by(&self.self_id) {
            report.skipped = Some(SkipReason::SelfAuthored);
            return Ok(report);
        }

        tracing::trace!(
            community_id = event.community_id,
            conversation_id = %event.conversation_id,
            author_id = %event.author_id,
            message_kind = %event.message_kind,
            media_kind = %event.media_kind,
            "Dispatching chat message"
        );

        self.dispatch_mention(&event, &mut report);
        self.dispatch_events(&event, &mut report);
        self.dispatch_command(&event, &mut report);

        Ok(report)
    }

    fn dispatch_mention(&self, event: &Arc<ChatEvent>, report: &mut DispatchReport) {
        let Some(callback) = self.registry.mention() else {
            return;
        };
        if event.mentions(&self.self_id) {
            self.spawn("mention".to_string(), callback(self.context(event)), report);
        }
    }

    fn dispatch_events(&self, event: &Arc<ChatEvent>, report: &mut DispatchReport) {
        for handler in self.registry.events() {
            if handler.filter.accepts(event.message_kind, event.media_kind) {
                self.spawn(
                    handler.name.clone(),
                    (handler.callback)(self.context(event)),
                    report,
                );
            }
        }
    }

    fn dispatch_command(&self, event: &Arc<ChatEvent>, report: &mut DispatchReport) {
        let Some(text) = event.text.as_deref() else {
            return;
        };
        let Some((handler, command)) = self.registry.match_command(text) else {
            return;
        };

        if text.contains(HELP_FLAG) {
            self.spawn_help(handler, self.context(event), report);
            return;
        }

        let remainder = text.get(command.len()..).unwrap_or_default();
        let args = match parse_arguments(&handler.args, remainder) {
            Ok(args) => args,
            Err(e) if e.is_missing() => {
                tracing::info!(command = %handler.name(), error = %e, "Dropping command");
                return;
            }
            Err(e) => {
                tracing::error!(command = %handler.name(), error = %e, "Dropping command");
                return;
            }
        };

        if !handler.filter.accepts(event.message_kind, event.media_kind) {
            tracing::debug!(
                command = %handler.name(),
                message_kind = %event.message_kind,
                media_kind = %event.media_kind,
                "Command does not accept this message kind"
            );
            return;
        }

        self.spawn(
            handler.name().to_string(),
            (handler.callback)(self.context(event), args),
            report,
        );
    }

    fn spawn_help(&self, handler: &CommandHandler, ctx: Context, report: &mut DispatchReport) {
        let description = handler.description.clone();
        self.spawn(
            format!("help:{}", handler.name()),
            Box::pin(async move {
                ctx.reply(description).await?;
                Ok(())
            }),
            report,
        );
    }

    fn context(&self, event: &Arc<ChatEvent>) -> Context {
        Context::new(
            Arc::clone(event),
            self.gateway.scoped(event.community_id),
            Arc::clone(&self.connection),
            Arc::clone(&self.waiter),
        )
    }

    /// Spawn a handler future, logging the error it returns
    fn spawn(&self, name: String, future: HandlerFuture, report: &mut DispatchReport) {
        report.scheduled.push(name.clone());
        self.tasks.spawn(async move {
            if let Err(e) = future.await {
                tracing::error!(handler = %name, error = ?e, "Handler failed");
            }
        });
    }

    /// Run the ready callback, if any, to completion
    pub async fn fire_ready(&self, profile: UserProfile) {
        if let Some(callback) = self.registry.ready() {
            if let Err(e) = callback(profile).await {
                tracing::error!(handler = "ready", error = ?e, "Handler failed");
            }
        }
    }

    /// Wait up to `grace` for running handler tasks
    ///
    /// Returns whether every task finished in time. New tasks may still be
    /// spawned afterwards.
    pub async fn drain(&self, grace: Duration) -> bool {
        self.tasks.close();
        let finished = tokio::time::timeout(grace, self.tasks.wait()).await.is_ok();
        self.tasks.reopen();

        if !finished {
            tracing::warn!(
                running = self.tasks.len(),
                "Handler tasks still running after grace period"
            );
        }
        finished
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("self_id", &self.self_id)
            .field("registry", &self.registry)
            .field("running_tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}
