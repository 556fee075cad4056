//! Connection Integration Tests
//!
//! Runs a full bot against a local WebSocket server. Authentication and
//! replies go through a recording gateway; nothing leaves the machine.
//!
//! Run with: cargo test -p integration-tests --test connection_tests

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use integration_tests::*;
use narvii_common::{BotConfig, BotError, BotResult, SessionStore};
use narvii_core::Session;
use narvii_gateway::{Bot, CommandSpec};
use tokio::sync::oneshot;

const PATIENCE: Duration = Duration::from_secs(5);

/// Run `bot` until `driver` finishes, then shut it down
async fn run_with<F>(bot: Bot, driver: F) -> BotResult<()>
where
    F: Future<Output = ()>,
{
    let (stop, stopped) = oneshot::channel::<()>();
    let run = bot.run_until(async {
        let _ = stopped.await;
    });
    let drive = async move {
        driver.await;
        let _ = stop.send(());
    };

    let (result, ()) = tokio::time::timeout(Duration::from_secs(20), async {
        tokio::join!(run, drive)
    })
    .await
    .expect("test timed out");
    result
}

fn counting_ready(bot: &mut Bot) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    bot.on_ready(move |_profile| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });
    count
}

async fn wait_until(condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + PATIENCE;
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "condition not met in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn bot(config: BotConfig, gateway: &RecordingGateway) -> Bot {
    Bot::new(config, Arc::new(gateway.clone()))
}

#[tokio::test]
async fn test_failover_then_ping_round_trip() {
    let server = MockSocketServer::start().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), vec![refused_host().await.unwrap(), server.url()]);
    let gateway = RecordingGateway::new();

    let mut bot = bot(config, &gateway);
    let ready = counting_ready(&mut bot);
    bot.command(CommandSpec::new(["ping"]), |ctx, _args| async move {
        ctx.typing(ctx.reply("Pong!")).await?;
        Ok(())
    })
    .unwrap();

    let result = run_with(bot, async {
        wait_until(|| ready.load(Ordering::SeqCst) == 1).await;
        server.push(ChatFrame::text("/ping").to_json());

        let sends = gateway.wait_for_calls("send_message", 1, PATIENCE).await;
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].community_id, COMMUNITY_ID);

        let start = server.next_received(PATIENCE).await.unwrap();
        let stop = server.next_received(PATIENCE).await.unwrap();
        assert_eq!(start["t"], 304);
        assert_eq!(stop["t"], 306);
        assert_eq!(start["o"]["target"], "ndc://x5/chat-thread/T1");
    })
    .await;
    assert!(result.is_ok());

    let handshakes = server.handshakes();
    assert_eq!(handshakes.len(), 1);
    assert!(handshakes[0].uri.contains(&format!("signbody={TEST_DEVICE_ID}%7C")));
    assert_eq!(handshakes[0].device_id.as_deref(), Some(TEST_DEVICE_ID));
    assert_eq!(handshakes[0].auth.as_deref(), Some("sid=sid-1"));
    assert!(handshakes[0].signature.as_deref().is_some_and(|sig| !sig.is_empty()));

    assert_eq!(gateway.login_count(), 1);
    assert!(dir.path().join("session.json").exists());
}

#[tokio::test]
async fn test_rotation_reconnects_and_fires_ready_again() {
    let server = MockSocketServer::start().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), vec![server.url()]);
    config.socket.rotate_interval = Duration::from_millis(200);
    let gateway = RecordingGateway::new();

    let mut bot = bot(config, &gateway);
    let ready = counting_ready(&mut bot);

    let result = run_with(bot, async {
        wait_until(|| ready.load(Ordering::SeqCst) >= 2).await;
    })
    .await;
    assert!(result.is_ok());

    let handshakes = server.wait_for_handshakes(2, PATIENCE).await;
    assert!(handshakes.len() >= 2);
    assert!(handshakes.iter().all(|h| h.auth.as_deref() == Some("sid=sid-1")));
    assert_eq!(gateway.login_count(), 1);
}

#[tokio::test]
async fn test_rotation_refreshes_stale_session() {
    let server = MockSocketServer::start().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), vec![server.url()]);
    config.socket.rotate_interval = Duration::from_millis(200);
    config.session_ttl_hours = 0;
    let gateway = RecordingGateway::new();

    let mut bot = bot(config, &gateway);
    let ready = counting_ready(&mut bot);

    let result = run_with(bot, async {
        wait_until(|| ready.load(Ordering::SeqCst) >= 2).await;
    })
    .await;
    assert!(result.is_ok());

    assert!(gateway.login_count() >= 2);
    let handshakes = server.handshakes();
    assert_eq!(handshakes[0].auth.as_deref(), Some("sid=sid-1"));
    assert_eq!(handshakes[1].auth.as_deref(), Some("sid=sid-2"));
}

#[tokio::test]
async fn test_server_close_waits_before_reconnecting() {
    let server = MockSocketServer::start_closing().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), vec![server.url()]);
    let gateway = RecordingGateway::new();

    let mut bot = bot(config, &gateway);
    let ready = counting_ready(&mut bot);

    let result = run_with(bot, async {
        tokio::time::sleep(Duration::from_millis(500)).await;
    })
    .await;
    assert!(result.is_ok());

    // 50ms between reconnects allows roughly ten in 500ms
    let handshakes = server.handshakes().len();
    assert!(handshakes >= 2, "expected reconnects, got {handshakes}");
    assert!(handshakes <= 15, "reconnected without delay: {handshakes}");
    assert!(ready.load(Ordering::SeqCst) <= handshakes);
    assert_eq!(gateway.login_count(), 1);
}

#[tokio::test]
async fn test_server_close_refreshes_stale_session() {
    let server = MockSocketServer::start_closing().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), vec![server.url()]);
    config.session_ttl_hours = 0;
    let gateway = RecordingGateway::new();

    let result = run_with(bot(config, &gateway), async {
        server.wait_for_handshakes(2, PATIENCE).await;
    })
    .await;
    assert!(result.is_ok());

    let handshakes = server.handshakes();
    assert_eq!(handshakes[0].auth.as_deref(), Some("sid=sid-1"));
    assert_eq!(handshakes[1].auth.as_deref(), Some("sid=sid-2"));
}

#[tokio::test]
async fn test_saved_session_skips_login() {
    let server = MockSocketServer::start().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), vec![server.url()]);
    SessionStore::new(&config.session_file)
        .save("bot@example.com", "secret", &Session::new("saved-sid", BOT_ID))
        .unwrap();
    let gateway = RecordingGateway::new();

    let mut bot = bot(config, &gateway);
    let ready = counting_ready(&mut bot);

    let result = run_with(bot, async {
        wait_until(|| ready.load(Ordering::SeqCst) == 1).await;
    })
    .await;
    assert!(result.is_ok());

    assert_eq!(gateway.login_count(), 0);
    let lookups = gateway.calls_to("get_user_info");
    assert_eq!(lookups[0].args, vec![BOT_ID]);
    assert_eq!(server.handshakes()[0].auth.as_deref(), Some("sid=saved-sid"));
}

#[tokio::test]
async fn test_unreachable_hosts_keep_retrying_until_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), vec![refused_host().await.unwrap()]);
    let gateway = RecordingGateway::new();

    let mut bot = bot(config, &gateway);
    let ready = counting_ready(&mut bot);

    let result = run_with(bot, async {
        tokio::time::sleep(Duration::from_millis(300)).await;
    })
    .await;

    assert!(result.is_ok());
    assert_eq!(ready.load(Ordering::SeqCst), 0);
    assert_eq!(gateway.login_count(), 1);
}

#[tokio::test]
async fn test_rejected_login_is_fatal() {
    let server = MockSocketServer::start().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), vec![server.url()]);
    let gateway = RecordingGateway::new().rejecting_login();

    let result = tokio::time::timeout(
        PATIENCE,
        bot(config, &gateway).run_until(std::future::pending()),
    )
    .await
    .expect("run should fail fast");

    assert!(matches!(result, Err(BotError::Api(_))));
    assert!(server.handshakes().is_empty());
}

#[tokio::test]
async fn test_background_tasks_restart_and_stop_on_shutdown() {
    let server = MockSocketServer::start().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), vec![server.url()]);
    let gateway = RecordingGateway::new();

    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let mut bot = bot(config, &gateway);
    bot.background_task("tick", move |_gateway| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(())
        }
    });

    let result = run_with(bot, async {
        wait_until(|| runs.load(Ordering::SeqCst) >= 3).await;
    })
    .await;
    assert!(result.is_ok());

    let after_shutdown = runs.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(runs.load(Ordering::SeqCst), after_shutdown);
}
