use hookwire::prelude::*;
use hookwire::{Event, EventKind, LifecycleState, RecordingSink};
use std::sync::Mutex;
use std::time::Duration;

type Journal = Arc<Mutex<Vec<String>>>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// A component whose start/stop outcome is fixed up front
struct Component {
    name: &'static str,
    start_ok: bool,
    stop_ok: bool,
    journal: Journal,
}

impl Component {
    fn hook(journal: &Journal, name: &'static str, start_ok: bool, stop_ok: bool) -> Hook {
        Hook::from_component(Arc::new(Component {
            name,
            start_ok,
            stop_ok,
            journal: Arc::clone(journal),
        }))
        .named(name)
    }
}

#[async_trait]
impl OnStart for Component {
    async fn on_start(&self, _ctx: Context) -> anyhow::Result<()> {
        self.journal.lock().unwrap().push(format!("{}.start", self.name));
        anyhow::ensure!(self.start_ok, "{} could not start", self.name);
        Ok(())
    }
}

#[async_trait]
impl OnStop for Component {
    async fn on_stop(&self, _ctx: Context) -> anyhow::Result<()> {
        self.journal.lock().unwrap().push(format!("{}.stop", self.name));
        anyhow::ensure!(self.stop_ok, "{} could not stop", self.name);
        Ok(())
    }
}

fn build(hooks: Vec<Hook>, sink: Arc<RecordingSink>) -> App {
    App::builder()
        .event_sink(sink)
        .invoke(move |scope| {
            for hook in hooks {
                scope.append(hook)?;
            }
            Ok(())
        })
        .build()
        .expect("application should build")
}

#[tokio::test]
async fn test_failed_start_stops_only_started_hooks() {
    init_tracing();
    let journal = Journal::default();
    let app = build(
        vec![
            Component::hook(&journal, "H1", true, true),
            Component::hook(&journal, "H2", false, true),
            Component::hook(&journal, "H3", true, true),
        ],
        Arc::new(RecordingSink::new()),
    );
    let ctx = Context::new();

    let err = app.start(&ctx).await.unwrap_err();
    assert_eq!(err.index(), Some(1));
    assert!(err.to_string().contains("H2"));
    assert_eq!(app.lifecycle().state(), LifecycleState::Failed);
    assert_eq!(app.lifecycle().started_count(), 1);

    app.stop(&ctx).await.expect("stop after failed start should succeed");
    assert_eq!(
        *journal.lock().unwrap(),
        vec!["H1.start", "H2.start", "H1.stop"]
    );
    assert_eq!(app.lifecycle().state(), LifecycleState::Stopped);
}

#[tokio::test]
async fn test_stop_failure_does_not_halt_stop() {
    init_tracing();
    let journal = Journal::default();
    let sink = Arc::new(RecordingSink::new());
    let app = build(
        vec![
            Component::hook(&journal, "H1", true, true),
            Component::hook(&journal, "H2", true, true),
            Component::hook(&journal, "H3", true, false),
        ],
        Arc::clone(&sink),
    );
    let ctx = Context::new();

    app.start(&ctx).await.unwrap();
    let err = app.stop(&ctx).await.unwrap_err();

    let failures = err.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].hook, "H3");
    assert_eq!(failures[0].index, 2);
    assert_eq!(
        *journal.lock().unwrap(),
        vec!["H1.start", "H2.start", "H3.start", "H3.stop", "H2.stop", "H1.stop"]
    );

    let stopped = sink
        .events()
        .into_iter()
        .find(|event| event.kind() == EventKind::Stopped)
        .expect("a stopped event");
    assert!(stopped.error().is_some_and(|e| e.contains("H3")));
}

#[tokio::test]
async fn test_run_with_config_timeouts() {
    init_tracing();
    let journal = Journal::default();
    let hook = Component::hook(&journal, "db", true, true);
    let config = AppConfig {
        start_timeout: Duration::from_millis(500),
        stop_timeout: Duration::from_millis(500),
        ..AppConfig::default()
    };
    let app = App::builder()
        .config(config)
        .invoke(move |scope| Ok(scope.append(hook)?))
        .build()
        .unwrap();

    app.run_until(tokio::time::sleep(Duration::from_millis(10)))
        .await
        .unwrap();
    assert_eq!(*journal.lock().unwrap(), vec!["db.start", "db.stop"]);
}

#[tokio::test]
async fn test_hook_panic_is_recovered_at_top_level() {
    init_tracing();
    let journal = Journal::default();
    let sink = Arc::new(RecordingSink::new());
    let first = Component::hook(&journal, "H1", true, true);
    let app = App::builder()
        .recover_from_panics()
        .event_sink(sink.clone())
        .invoke(move |scope| {
            scope.append(first)?;
            scope.append(Hook::new().named("exploding").on_start(|_| async {
                if true {
                    panic!("boom");
                }
                Ok(())
            }))?;
            Ok(())
        })
        .build()
        .unwrap();

    let err = app.run_until(async {}).await.unwrap_err();
    assert!(err.to_string().contains("exploding"));
    assert_eq!(*journal.lock().unwrap(), vec!["H1.start", "H1.stop"]);
    assert!(sink.events().iter().any(|event| matches!(
        event,
        Event::PanicRecovered { payload, .. } if payload == "boom"
    )));
}

#[tokio::test]
async fn test_late_append_is_rejected_after_start() {
    let app = App::builder().build().unwrap();
    let ctx = Context::new();
    app.start(&ctx).await.unwrap();

    let err = app.lifecycle().append(Hook::new()).unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidState { .. }));
    assert!(app.lifecycle().is_empty());
}

#[tokio::test]
async fn test_events_follow_hook_order() {
    let journal = Journal::default();
    let sink = Arc::new(RecordingSink::new());
    let app = build(vec![Component::hook(&journal, "H1", true, true)], sink.clone());
    let ctx = Context::new();
    app.start(&ctx).await.unwrap();
    app.stop(&ctx).await.unwrap();

    assert_eq!(
        sink.kinds(),
        vec![
            EventKind::Invoked,
            EventKind::HookStartExecuting,
            EventKind::HookStartExecuted,
            EventKind::Started,
            EventKind::HookStopExecuting,
            EventKind::HookStopExecuted,
            EventKind::Stopped,
        ]
    );
}
