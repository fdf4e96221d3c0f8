use addin_probe::platforms::memory::{MemoryEngine, MemoryNode};
use addin_probe::{
    AccessibilityEngine, ControlKind, Deadline, Desktop, ElementQuery, ElementResolver, Strategy,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

const POLL: Duration = Duration::from_millis(20);

fn window(children: Vec<MemoryNode>) -> (MemoryEngine, Arc<dyn AccessibilityEngine>) {
    let engine = MemoryEngine::new(
        MemoryNode::desktop().child(
            MemoryNode::new(ControlKind::Window)
                .key("main")
                .named("Autodesk Revit 2026")
                .bounds(0.0, 0.0, 1920.0, 1040.0)
                .children(children),
        ),
    );
    let shared: Arc<dyn AccessibilityEngine> = Arc::new(engine.clone());
    (engine, shared)
}

#[test]
fn test_deadline_remaining_never_increases() {
    let deadline = Deadline::after(Duration::from_millis(60));
    let mut previous = deadline.remaining();
    while !deadline.has_expired() {
        let now = deadline.remaining();
        assert!(now <= previous);
        previous = now;
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(deadline.remaining(), Duration::ZERO);
}

#[test]
fn test_earlier_strategy_wins_when_both_match() {
    let (engine, shared) = window(vec![
        MemoryNode::new(ControlKind::DataItem).key("row").named("Project1"),
        MemoryNode::new(ControlKind::ListItem)
            .key("list-row")
            .child(MemoryNode::new(ControlKind::Text).named("Project1")),
    ]);
    let resolver = ElementResolver::new(shared, POLL);
    let chain = vec![
        Strategy::from(ElementQuery::kind_named(ControlKind::DataItem, "Project1")),
        Strategy::parent_of(ElementQuery::kind_named(ControlKind::Text, "Project1")),
    ];
    let main = engine.element("main").unwrap();

    let found = resolver
        .resolve(&main, &chain, &Deadline::after(Duration::from_millis(200)))
        .unwrap()
        .unwrap();
    assert_eq!(found, engine.element("row").unwrap());

    // Reversing the chain flips the winner even though both still match.
    let reversed: Vec<Strategy> = chain.into_iter().rev().collect();
    let found = resolver
        .resolve(&main, &reversed, &Deadline::after(Duration::from_millis(200)))
        .unwrap()
        .unwrap();
    assert_eq!(found, engine.element("list-row").unwrap());
}

#[test]
fn test_unmatched_strategy_does_not_suppress_a_later_one() {
    let (engine, shared) = window(vec![MemoryNode::new(ControlKind::Pane)
        .key("pane-row")
        .named("Project1")]);
    let resolver = ElementResolver::new(shared, POLL);
    let main = engine.element("main").unwrap();

    let started = Instant::now();
    let found = resolver
        .resolve(
            &main,
            &addin_probe::orchestrator::recent_item_chain("Project1"),
            &Deadline::after(Duration::from_secs(2)),
        )
        .unwrap()
        .unwrap();

    assert_eq!(found, engine.element("pane-row").unwrap());
    // Found on the first iteration, not after cycling through the chain.
    assert!(started.elapsed() < POLL * 5, "{:?}", started.elapsed());
}

#[test]
fn test_delayed_button_is_found_once_it_appears() {
    let (engine, shared) = window(vec![MemoryNode::new(ControlKind::Button)
        .named("Execute")
        .bounds(40.0, 105.0, 120.0, 30.0)
        .appear_after(Duration::from_millis(150))]);
    let resolver = ElementResolver::new(shared, POLL);
    let main = engine.element("main").unwrap();

    let started = Instant::now();
    let found = resolver
        .resolve_visible(
            &main,
            &["role:Button && name:Execute".into()],
            &Deadline::after(Duration::from_secs(2)),
        )
        .unwrap();
    let elapsed = started.elapsed();

    assert!(found.is_some());
    assert!(elapsed >= Duration::from_millis(140), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(1), "{elapsed:?}");
}

#[test]
fn test_absent_button_gives_up_at_the_deadline() {
    let (engine, shared) = window(vec![]);
    let resolver = ElementResolver::new(shared, POLL);
    let main = engine.element("main").unwrap();

    let started = Instant::now();
    let found = resolver
        .resolve(
            &main,
            &[ElementQuery::kind_named(ControlKind::Button, "Execute").into()],
            &Deadline::after(Duration::from_millis(200)),
        )
        .unwrap();
    let elapsed = started.elapsed();

    assert!(found.is_none());
    assert!(elapsed >= Duration::from_millis(200), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(200) + POLL * 10, "{elapsed:?}");
}

#[test]
fn test_flaky_subtree_does_not_abort_resolution() {
    let (engine, shared) = window(vec![MemoryNode::new(ControlKind::Pane)
        .named("Ribbon")
        .flaky(3)
        .child(MemoryNode::new(ControlKind::Button).named("ElectricalLoadPlugin"))]);
    let resolver = ElementResolver::new(shared, POLL);
    let main = engine.element("main").unwrap();

    let found = resolver
        .resolve(
            &main,
            &[ElementQuery::kind_named(ControlKind::Button, "ElectricalLoadPlugin").into()],
            &Deadline::after(Duration::from_secs(1)),
        )
        .unwrap();
    assert!(found.is_some());
}

#[test]
fn test_re_resolved_handles_share_a_fingerprint() {
    let (engine, shared) = window(vec![
        MemoryNode::new(ControlKind::Button)
            .named("Execute")
            .automation_id("btnExecute")
            .class_name("Button"),
        MemoryNode::new(ControlKind::Button).named("Insert Equipment"),
    ]);
    let main = engine.element("main").unwrap();
    let query = ElementQuery::kind_named(ControlKind::Button, "Execute");

    let first = shared.find_first(&main, &query).unwrap().unwrap();
    let second = shared.find_first(&main, &query).unwrap().unwrap();
    let other = shared
        .find_first(&main, &ElementQuery::name("Insert Equipment"))
        .unwrap()
        .unwrap();

    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(first.fingerprint(), first.fingerprint());
    assert_ne!(first.fingerprint(), other.fingerprint());
}

#[tokio::test]
async fn test_locator_wait_does_not_block_the_runtime() {
    let engine = MemoryEngine::new(
        MemoryNode::desktop().child(
            MemoryNode::new(ControlKind::Window)
                .named("ElectricalLoadPlugin")
                .appear_after(Duration::from_millis(100)),
        ),
    );
    let desktop = Desktop::with_engine(Arc::new(engine));

    let waiting = desktop
        .locator("role:Window && name:ElectricalLoadPlugin")
        .timeout(Duration::from_secs(2))
        .poll_interval(POLL);
    let ticker = tokio::spawn(async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        "ticked"
    });

    let dialog = waiting.wait().await.unwrap();
    assert_eq!(ticker.await.unwrap(), "ticked");
    assert_eq!(dialog.name().unwrap().as_deref(), Some("ElectricalLoadPlugin"));

    let missing = desktop
        .locator("role:Window && name:Nope")
        .timeout(Duration::from_millis(100))
        .poll_interval(POLL)
        .wait()
        .await;
    assert!(matches!(missing, Err(addin_probe::AutomationError::Timeout(_))));
}
