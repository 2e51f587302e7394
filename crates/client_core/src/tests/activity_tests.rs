use super::*;
use crate::test_support::{context, FakeBackend};
use tokio::time::sleep;

const MINUTE: Duration = Duration::from_secs(60);

#[test]
fn sends_under_threshold_never_warn() {
    let start = Instant::now();
    let mut monitor = ActivityMonitor::new(start, INACTIVITY_WARNING_AFTER);
    for minute in 1..=60 {
        let now = start + MINUTE * minute;
        assert!(monitor.check(now).is_none(), "warned at minute {minute}");
        if minute % 10 == 0 {
            monitor.record_activity(now);
        }
    }
    assert_eq!(monitor.state(), ActivityState::Fresh);
}

#[test]
fn warns_once_threshold_is_reached_then_restarts_countdown() {
    let start = Instant::now();
    let mut monitor = ActivityMonitor::new(start, INACTIVITY_WARNING_AFTER);

    assert!(monitor.check(start + MINUTE * 14).is_none());
    let warning = monitor.check(start + MINUTE * 15).expect("warning");
    assert_eq!(warning.username, "System");
    assert!(warning.content.contains("20 minutes"));
    assert_eq!(monitor.state(), ActivityState::Warned);

    assert!(monitor.check(start + MINUTE * 16).is_none());
    assert!(monitor.check(start + MINUTE * 29).is_none());
    assert!(monitor.check(start + MINUTE * 30).is_some());
}

#[test]
fn send_resets_countdown_and_state() {
    let start = Instant::now();
    let mut monitor = ActivityMonitor::new(start, INACTIVITY_WARNING_AFTER);
    assert!(monitor.check(start + MINUTE * 15).is_some());

    monitor.record_activity(start + MINUTE * 20);
    assert_eq!(monitor.state(), ActivityState::Fresh);
    assert!(monitor.check(start + MINUTE * 34).is_none());
    assert!(monitor.check(start + MINUTE * 35).is_some());
}

#[tokio::test(start_paused = true)]
async fn watch_appends_one_warning_per_threshold_period() {
    let (ctx, view) = context(FakeBackend::new());
    let task = spawn_activity_watch(Arc::clone(&ctx));

    sleep(MINUTE * 14 + Duration::from_secs(30)).await;
    assert!(view.snapshot().transcript.is_empty());

    sleep(MINUTE).await;
    let transcript = view.snapshot().transcript;
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].source.username, "System");

    sleep(MINUTE * 5).await;
    assert_eq!(view.snapshot().transcript.len(), 1);

    task.abort();
}

#[tokio::test(start_paused = true)]
async fn recorded_activity_suppresses_pending_warning() {
    let (ctx, view) = context(FakeBackend::new());
    let task = spawn_activity_watch(Arc::clone(&ctx));

    sleep(MINUTE * 10 + Duration::from_secs(30)).await;
    ctx.state.lock().await.activity.record_activity(Instant::now());
    sleep(MINUTE * 10).await;
    assert!(view.snapshot().transcript.is_empty());

    task.abort();
}
