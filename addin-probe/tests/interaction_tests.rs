use addin_probe::platforms::memory::{Activation, InputEvent, MemoryEngine, MemoryNode};
use addin_probe::simulation::{keys, simulated_session};
use addin_probe::{
    AccessibilityEngine, Bounds, CandidateSelector, Capability, ControlKind, CornerBand,
    ElementQuery, InteractionDispatcher, Point, Scenario,
};
use std::sync::Arc;
use std::time::Duration;

fn dispatcher(engine: &MemoryEngine) -> InteractionDispatcher {
    InteractionDispatcher::new(Arc::new(engine.clone()), Duration::from_millis(1))
}

#[test]
fn test_pointer_only_element_is_clicked_at_its_center() {
    let engine = MemoryEngine::new(
        MemoryNode::desktop().child(
            MemoryNode::new(ControlKind::Button)
                .named("Execute")
                .bounds(100.0, 100.0, 40.0, 20.0),
        ),
    );
    let button = engine.element("Execute").unwrap();

    let outcome = dispatcher(&engine).dispatch(&button);

    assert_eq!(outcome.method, Some(Capability::PointerClick));
    assert!(outcome.attempts.is_empty());
    let center = Point::new(120.0, 110.0);
    assert_eq!(
        engine.input_events(),
        vec![InputEvent::Move(center), InputEvent::Click(center)]
    );
    assert_eq!(engine.activations_of("Execute"), vec![Activation::Click]);
}

#[test]
fn test_selectable_element_never_reaches_the_pointer() {
    let engine = MemoryEngine::new(
        MemoryNode::desktop().child(
            MemoryNode::new(ControlKind::ListItem)
                .named("Project1")
                .bounds(40.0, 160.0, 300.0, 40.0)
                .with(Capability::SelectionItem)
                .with(Capability::Invoke),
        ),
    );
    let item = engine.element("Project1").unwrap();

    let outcome = dispatcher(&engine).dispatch(&item);

    assert_eq!(outcome.method, Some(Capability::SelectionItem));
    assert!(engine.input_events().is_empty());
    assert_eq!(engine.activations_of("Project1"), vec![Activation::Select]);
}

#[test]
fn test_every_failing_capability_is_reported() {
    let engine = MemoryEngine::new(
        MemoryNode::desktop().child(
            MemoryNode::new(ControlKind::Button)
                .named("Execute")
                .failing(Capability::Invoke)
                .failing(Capability::LegacyAction),
        ),
    );
    let button = engine.element("Execute").unwrap();

    let outcome = dispatcher(&engine).dispatch(&button);

    // No bounds, so the pointer fallback is not even attempted.
    assert!(!outcome.succeeded());
    let tried: Vec<Capability> = outcome.attempts.iter().map(|(cap, _)| *cap).collect();
    assert_eq!(tried, vec![Capability::Invoke, Capability::LegacyAction]);
}

#[test]
fn test_equal_sized_glyphs_resolve_to_the_right_most() {
    let engine = MemoryEngine::new(
        MemoryNode::desktop().children([
            MemoryNode::new(ControlKind::Hyperlink)
                .key("inner")
                .bounds(76.0, 10.0, 24.0, 24.0)
                .with(Capability::Invoke),
            MemoryNode::new(ControlKind::Hyperlink)
                .key("outer")
                .bounds(116.0, 10.0, 24.0, 24.0)
                .with(Capability::Invoke),
        ]),
    );
    let root = engine.root();
    let links = engine
        .find_all(&root, &ElementQuery::kind(ControlKind::Hyperlink))
        .unwrap();
    let anchor = Bounds::new(0.0, 0.0, 200.0, 100.0);

    let picked = CandidateSelector::new(CornerBand::default())
        .select(links, anchor)
        .unwrap();
    assert_eq!(picked, engine.element("outer").unwrap());
}

#[test]
fn test_startup_popup_closes_through_its_corner_glyph() {
    let engine = MemoryEngine::new(simulated_session(&Scenario::default(), Duration::ZERO));
    let main = engine.element(keys::MAIN).unwrap();
    let popup = engine
        .find_first(&main, &ElementQuery::kind_named(ControlKind::Document, "IPM Loader"))
        .unwrap()
        .unwrap();
    let links = engine
        .find_all(&popup, &ElementQuery::kind(ControlKind::Hyperlink))
        .unwrap();
    assert_eq!(links.len(), 2);

    let close = CandidateSelector::default()
        .select(links, popup.bounds().unwrap())
        .unwrap();
    assert_eq!(close, engine.element(keys::POPUP_CLOSE).unwrap());

    assert!(dispatcher(&engine).invoke(&close));
    assert!(!engine.exists(keys::POPUP));
    assert_eq!(
        engine.activations_of(keys::POPUP_CLOSE),
        vec![Activation::Invoke]
    );
}

#[test]
fn test_double_click_opens_recent_project() {
    let engine = MemoryEngine::new(simulated_session(&Scenario::default(), Duration::ZERO));
    engine.apply(addin_probe::platforms::memory::Effect::Remove(
        keys::POPUP.to_string(),
    ));
    engine.apply(addin_probe::platforms::memory::Effect::Reveal(
        keys::RECENT_ITEM.to_string(),
    ));
    let main = engine.element(keys::MAIN).unwrap();
    let item = engine.element(keys::RECENT_ITEM).unwrap();

    assert!(dispatcher(&engine).double_click(&item, Some(&main)));

    assert_eq!(
        engine.activations_of(keys::RECENT_ITEM),
        vec![Activation::ScrollIntoView, Activation::DoubleClick]
    );
    assert!(main.name().unwrap().unwrap_or_default().contains("Project1"));
    assert!(engine.exists(keys::RIBBON));
}
