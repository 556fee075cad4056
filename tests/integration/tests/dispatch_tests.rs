//! Dispatch Integration Tests
//!
//! Drives the dispatcher with frames directly. Replies go to a recording
//! gateway and socket frames to an in-memory channel, so no network is used.
//!
//! Run with: cargo test -p integration-tests --test dispatch_tests

use std::sync::Arc;
use std::time::Duration;

use integration_tests::*;
use narvii_common::BotError;
use narvii_core::{MediaKind, MessageKind};
use narvii_gateway::{
    ArgSpec, CommandArgs, CommandSpec, Connection, Context, DispatchReport, EventDispatcher,
    HandlerRegistry, KindFilter, OutgoingFrame, PendingResponses, SkipReason,
};
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::mpsc;

const GRACE: Duration = Duration::from_secs(2);

struct Harness {
    gateway: RecordingGateway,
    frames: mpsc::Receiver<OutgoingFrame>,
    dispatcher: EventDispatcher,
}

impl Harness {
    fn new(registry: HandlerRegistry) -> Self {
        let gateway = RecordingGateway::new();
        let connection = Connection::new();
        let (tx, frames) = mpsc::channel(32);
        connection.attach("test-session", "ws://test", tx);

        let dispatcher = EventDispatcher::new(
            Arc::new(registry),
            Arc::new(gateway.clone()),
            connection,
            Arc::new(PendingResponses::new()),
            BOT_ID,
        );

        Self {
            gateway,
            frames,
            dispatcher,
        }
    }

    fn dispatch(&self, frame: &ChatFrame) -> DispatchReport {
        self.dispatcher.handle_frame(&frame.to_frame()).unwrap()
    }

    /// Wait for every scheduled handler to finish
    async fn settle(&self) {
        assert!(self.dispatcher.drain(GRACE).await, "handlers did not finish");
    }

    fn sent_frames(&mut self) -> Vec<OutgoingFrame> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.frames.try_recv() {
            frames.push(frame);
        }
        frames
    }

    async fn wait_for_pending(&self, count: usize) {
        for _ in 0..200 {
            if self.dispatcher.waiter().pending() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {count} pending waits");
    }
}

fn registry() -> HandlerRegistry {
    HandlerRegistry::new("/")
}

fn names(report: &DispatchReport) -> Vec<&str> {
    report.scheduled.iter().map(String::as_str).collect()
}

async fn ping(ctx: Context, _args: CommandArgs) -> anyhow::Result<()> {
    ctx.typing(ctx.reply("Pong!")).await?;
    Ok(())
}

async fn noop(_ctx: Context, _args: CommandArgs) -> anyhow::Result<()> {
    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

#[tokio::test]
async fn test_ping_replies_inside_typing_indicator() {
    let mut registry = registry();
    registry.register_command(CommandSpec::new(["ping"]), ping).unwrap();
    let mut harness = Harness::new(registry);

    let report = harness.dispatch(&ChatFrame::text("/ping").with_message_id("M1"));
    assert_eq!(names(&report), vec!["/ping"]);
    assert_eq!(report.skipped, None);
    harness.settle().await;

    let sends = harness.gateway.calls_to("send_message");
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].community_id, COMMUNITY_ID);
    assert_eq!(sends[0].args, vec![THREAD_ID.to_string()]);
    let message = sends[0].message.as_ref().unwrap();
    assert_eq!(message.content.as_deref(), Some("Pong!"));
    assert_eq!(message.reply_to.as_deref(), Some("M1"));

    let frames = harness.sent_frames();
    assert_eq!(frames.iter().map(|f| f.t).collect::<Vec<_>>(), vec![304, 306]);
    assert_eq!(frames[0].o["target"], "ndc://x5/chat-thread/T1");
    assert_eq!(frames[0].o["actions"], json!(["Typing"]));
    assert_eq!(frames[0].o["id"], frames[1].o["id"]);
}

#[tokio::test]
async fn test_own_messages_are_ignored() {
    let mut registry = registry();
    registry.register_command(CommandSpec::new(["ping"]), ping).unwrap();
    registry.register_mention(|_ctx| async { Ok(()) });
    registry.register_event(KindFilter::default(), |_ctx| async { Ok(()) });
    let mut harness = Harness::new(registry);

    let report = harness.dispatch(&ChatFrame::text("/ping").from_author(BOT_ID).mentioning(BOT_ID));
    assert_eq!(report.skipped, Some(SkipReason::SelfAuthored));
    assert!(report.scheduled.is_empty());

    harness.settle().await;
    assert!(harness.gateway.calls().is_empty());
    assert!(harness.sent_frames().is_empty());
}

#[tokio::test]
async fn test_command_match_is_case_insensitive() {
    let mut registry = registry();
    registry.register_command(CommandSpec::new(["ping"]), noop).unwrap();
    let harness = Harness::new(registry);

    assert_eq!(names(&harness.dispatch(&ChatFrame::text("/PiNg"))), vec!["/ping"]);
    assert!(harness.dispatch(&ChatFrame::text("ping")).scheduled.is_empty());
    assert!(harness.dispatch(&ChatFrame::text("say /ping")).scheduled.is_empty());
}

#[tokio::test]
async fn test_first_registered_command_wins() {
    let mut registry = registry();
    registry.register_command(CommandSpec::new(["s"]), noop).unwrap();
    registry.register_command(CommandSpec::new(["send"]), noop).unwrap();
    let harness = Harness::new(registry);

    let report = harness.dispatch(&ChatFrame::text("/send 5"));
    assert_eq!(names(&report), vec!["/s"]);
}

#[tokio::test]
async fn test_command_arguments_are_coerced() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let mut registry = registry();
    registry
        .register_command(
            CommandSpec::new(["send"])
                .arg(ArgSpec::int("coins"))
                .arg(ArgSpec::string("link")),
            move |_ctx, args| {
                let sink = Arc::clone(&sink);
                async move {
                    let coins = args.int("coins")?;
                    let link = args.str("link")?.to_string();
                    sink.lock().push((coins, link));
                    Ok(())
                }
            },
        )
        .unwrap();
    let harness = Harness::new(registry);

    assert_eq!(names(&harness.dispatch(&ChatFrame::text("/send 100 http://x"))), vec!["/send"]);
    assert!(harness.dispatch(&ChatFrame::text("/send abc http://x")).scheduled.is_empty());
    assert!(harness.dispatch(&ChatFrame::text("/send 100")).scheduled.is_empty());
    harness.settle().await;

    assert_eq!(*seen.lock(), vec![(100, "http://x".to_string())]);
}

#[tokio::test]
async fn test_rest_argument_keeps_original_case() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let mut registry = registry();
    registry
        .register_command(
            CommandSpec::new(["echo"]).arg(ArgSpec::rest("text")),
            move |_ctx, args| {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock().push(args.str("text")?.to_string());
                    Ok(())
                }
            },
        )
        .unwrap();
    let harness = Harness::new(registry);

    harness.dispatch(&ChatFrame::text("/ECHO Hello  World"));
    harness.settle().await;

    assert_eq!(*seen.lock(), vec!["Hello  World".to_string()]);
}

#[tokio::test]
async fn test_help_flag_replies_with_description() {
    let mut registry = registry();
    registry
        .register_command(
            CommandSpec::new(["ping"])
                .description("Replies with Pong!")
                .arg(ArgSpec::int("times")),
            ping,
        )
        .unwrap();
    registry.register_command(CommandSpec::new(["undocumented"]), noop).unwrap();
    let harness = Harness::new(registry);

    let report = harness.dispatch(&ChatFrame::text("/ping -h").with_message_id("M7"));
    assert_eq!(names(&report), vec!["help:/ping"]);
    harness.settle().await;
    harness.dispatch(&ChatFrame::text("/undocumented -h"));
    harness.settle().await;

    let replies: Vec<_> = harness
        .gateway
        .calls_to("send_message")
        .into_iter()
        .filter_map(|call| call.message)
        .collect();
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0].content.as_deref(), Some("Replies with Pong!"));
    assert_eq!(replies[0].reply_to.as_deref(), Some("M7"));
    assert_eq!(replies[1].content.as_deref(), Some("No description."));
}

#[tokio::test]
async fn test_command_kind_filter() {
    let mut registry = registry();
    registry.register_command(CommandSpec::new(["ping"]), noop).unwrap();
    registry
        .register_command(
            CommandSpec::new(["voice"])
                .message_kinds([MessageKind::VOICE])
                .media_kinds([MediaKind::AUDIO]),
            noop,
        )
        .unwrap();
    let harness = Harness::new(registry);

    let gif = ChatFrame::text("/ping").with_kinds(MessageKind::TEXT, MediaKind::GIF_AND_IMAGE);
    assert!(harness.dispatch(&gif).scheduled.is_empty());

    let voice = ChatFrame::text("/voice").with_kinds(MessageKind::VOICE, MediaKind::AUDIO);
    assert_eq!(names(&harness.dispatch(&voice)), vec!["/voice"]);

    // The message kind is checked against the accepted message kinds
    let wrong_type = ChatFrame::text("/voice").with_kinds(MessageKind::TEXT, MediaKind::AUDIO);
    assert!(harness.dispatch(&wrong_type).scheduled.is_empty());
}

// ============================================================================
// Events and mentions
// ============================================================================

#[tokio::test]
async fn test_event_handlers_filter_by_kind() {
    let mut registry = registry();
    registry.register_event(KindFilter::default(), |_ctx| async { Ok(()) });
    registry.register_event(
        KindFilter::new().media_kinds([MediaKind::GIF_AND_IMAGE]),
        |_ctx| async { Ok(()) },
    );
    registry.register_command(CommandSpec::new(["ping"]), noop).unwrap();
    let harness = Harness::new(registry);

    assert_eq!(names(&harness.dispatch(&ChatFrame::text("hello"))), vec!["event#0"]);
    assert_eq!(names(&harness.dispatch(&ChatFrame::text("/ping"))), vec!["event#0", "/ping"]);

    let gif = ChatFrame::text("look").with_kinds(MessageKind::TEXT, MediaKind::GIF_AND_IMAGE);
    assert_eq!(names(&harness.dispatch(&gif)), vec!["event#1"]);
}

#[tokio::test]
async fn test_mention_and_reply_trigger_mention_handler() {
    let mut registry = registry();
    registry.register_mention(|ctx| async move {
        ctx.reply("you called?").await?;
        Ok(())
    });
    let harness = Harness::new(registry);

    assert_eq!(names(&harness.dispatch(&ChatFrame::text("hey").mentioning(BOT_ID))), vec!["mention"]);
    assert_eq!(names(&harness.dispatch(&ChatFrame::text("hey").replying_to(BOT_ID))), vec!["mention"]);
    assert!(harness.dispatch(&ChatFrame::text("hey").mentioning("U9")).scheduled.is_empty());
    assert!(harness.dispatch(&ChatFrame::text("hey").replying_to("U9")).scheduled.is_empty());

    harness.settle().await;
    assert_eq!(harness.gateway.calls_to("send_message").len(), 2);
}

#[tokio::test]
async fn test_mention_fires_without_kind_fields() {
    let mut registry = registry();
    registry.register_mention(|_ctx| async { Ok(()) });
    registry.register_event(KindFilter::default(), |_ctx| async { Ok(()) });
    registry.register_command(CommandSpec::new(["ping"]), noop).unwrap();
    let harness = Harness::new(registry);

    let mut frame = ChatFrame::text("/ping").mentioning(BOT_ID).to_value();
    let message = frame["o"]["chatMessage"].as_object_mut().unwrap();
    message.remove("type");
    message.remove("mediaType");

    let report = harness.dispatcher.handle_text(&frame.to_string()).unwrap();
    assert_eq!(names(&report), vec!["mention"]);
    harness.settle().await;
}

// ============================================================================
// Frames
// ============================================================================

#[tokio::test]
async fn test_non_chat_frames_only_reach_waiters() {
    let mut registry = registry();
    registry.register_event(KindFilter::default(), |_ctx| async { Ok(()) });
    let harness = Harness::new(registry);

    let waiter = Arc::clone(harness.dispatcher.waiter());
    let wait = tokio::spawn(async move {
        waiter
            .wait_for(|frame| frame.kind().as_i64() == 10, Some(GRACE))
            .await
    });
    harness.wait_for_pending(1).await;

    let report = harness
        .dispatcher
        .handle_frame(&opaque_frame(10, json!({ "notice": true })))
        .unwrap();
    assert_eq!(report.skipped, Some(SkipReason::NotChatMessage));
    assert_eq!(report.fulfilled_waits, 1);
    assert!(report.scheduled.is_empty());

    let frame = wait.await.unwrap().unwrap();
    assert_eq!(frame.payload()["notice"], true);
}

#[tokio::test]
async fn test_malformed_frames_are_recoverable() {
    let harness = Harness::new(registry());

    let err = harness.dispatcher.handle_text("not json").unwrap_err();
    assert!(err.is_recoverable());

    let missing_thread = json!({
        "t": 1000,
        "o": { "ndcId": 5, "chatMessage": { "uid": "U2", "type": 0, "mediaType": 0 } }
    });
    let err = harness
        .dispatcher
        .handle_text(&missing_thread.to_string())
        .unwrap_err();
    assert!(matches!(err, BotError::Decode(_)));
    assert!(err.is_recoverable());
}

// ============================================================================
// Handler tasks
// ============================================================================

#[tokio::test]
async fn test_failing_handler_does_not_stop_dispatch() {
    let mut registry = registry();
    registry
        .register_command(CommandSpec::new(["fail"]), |_ctx, _args| async {
            anyhow::bail!("boom")
        })
        .unwrap();
    registry.register_command(CommandSpec::new(["ping"]), ping).unwrap();
    let harness = Harness::new(registry);

    harness.dispatch(&ChatFrame::text("/fail"));
    harness.dispatch(&ChatFrame::text("/ping"));
    harness.settle().await;

    assert_eq!(harness.gateway.calls_to("send_message").len(), 1);
}

#[tokio::test]
async fn test_drain_gives_up_after_grace() {
    let mut registry = registry();
    registry.register_event(KindFilter::default(), |_ctx| async {
        std::future::pending::<()>().await;
        Ok(())
    });
    let harness = Harness::new(registry);

    harness.dispatch(&ChatFrame::text("hello"));
    assert!(!harness.dispatcher.drain(Duration::from_millis(50)).await);
    assert_eq!(harness.dispatcher.running_tasks(), 1);
}

#[tokio::test]
async fn test_typing_stops_when_body_fails() {
    let mut registry = registry();
    registry
        .register_command(CommandSpec::new(["fail"]), |ctx, _args| async move {
            ctx.typing(async { Err::<(), _>(anyhow::anyhow!("boom")) }).await
        })
        .unwrap();
    let mut harness = Harness::new(registry);

    harness.dispatch(&ChatFrame::text("/fail"));
    harness.settle().await;

    let kinds: Vec<i64> = harness.sent_frames().iter().map(|f| f.t).collect();
    assert_eq!(kinds, vec![304, 306]);
}

#[tokio::test]
async fn test_recording_stops_when_body_panics() {
    let mut registry = registry();
    registry
        .register_command(CommandSpec::new(["panic"]), |ctx, _args| async move {
            let explode = true;
            ctx.recording(async move {
                assert!(!explode, "boom");
            })
            .await;
            Ok(())
        })
        .unwrap();
    let mut harness = Harness::new(registry);

    harness.dispatch(&ChatFrame::text("/panic"));
    harness.settle().await;

    let frames = harness.sent_frames();
    assert_eq!(frames.iter().map(|f| f.t).collect::<Vec<_>>(), vec![304, 306]);
    assert_eq!(frames[1].o["actions"], json!(["Recording"]));
}

// ============================================================================
// Context
// ============================================================================

#[tokio::test]
async fn test_next_message_waits_for_same_author_and_thread() {
    let answers = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&answers);

    let mut registry = registry();
    registry
        .register_command(CommandSpec::new(["ask"]), move |ctx, _args| {
            let sink = Arc::clone(&sink);
            async move {
                ctx.reply("What is your name?").await?;
                let answer = ctx.next_message(Some(GRACE)).await?;
                sink.lock().push(answer.text.unwrap_or_default());
                Ok(())
            }
        })
        .unwrap();
    let harness = Harness::new(registry);

    harness.dispatch(&ChatFrame::text("/ask"));
    harness.wait_for_pending(1).await;

    harness.dispatch(&ChatFrame::text("Mallory").from_author("U3"));
    let report = harness.dispatch(&ChatFrame::text("Alice"));
    assert_eq!(report.fulfilled_waits, 1);
    harness.settle().await;

    assert_eq!(*answers.lock(), vec!["Alice".to_string()]);
    assert_eq!(harness.dispatcher.waiter().pending(), 0);
}

#[tokio::test]
async fn test_context_acts_on_author_and_thread() {
    let mut registry = registry();
    registry
        .register_command(CommandSpec::new(["mod"]), |ctx, _args| async move {
            ctx.delete_message(true, Some("spam")).await?;
            ctx.kick(false).await?;
            ctx.invite("T9").await?;
            ctx.follow().await?;
            let profile = ctx.get_user_info().await?;
            anyhow::ensure!(profile.uid.as_deref() == Some(USER_ID));
            Ok(())
        })
        .unwrap();
    let harness = Harness::new(registry);

    harness.dispatch(&ChatFrame::text("/mod").in_community(7).with_message_id("M3"));
    harness.settle().await;

    let calls = harness.gateway.calls();
    assert!(calls.iter().all(|call| call.community_id == 7));

    let methods: Vec<&str> = calls.iter().map(|call| call.method).collect();
    assert_eq!(
        methods,
        vec!["delete_message", "kick_from_chat", "invite_to_chat", "follow", "get_user_info"]
    );
    assert_eq!(calls[0].args, vec!["T1", "M3", "true", "spam"]);
    assert_eq!(calls[1].args, vec!["T1", USER_ID, "false"]);
    assert_eq!(calls[2].args, vec![USER_ID, "T9"]);
    assert_eq!(calls[3].args, vec![USER_ID]);
}
