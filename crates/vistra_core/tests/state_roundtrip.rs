use vistra_core::{
    dump, dump_string, load, load_string, CommandEngine, DumpOptions, LoadMode, PropertyValue,
    Session,
};

fn populated_session() -> Session {
    let mut session = Session::new();
    let mut engine = CommandEngine::new();
    let script = "\
global.background=black
create sphere points
sphere.colour=red
sphere.opacity=0.7
model.pointsize=3
colourmap heat black red yellow
figure overview";
    let errors = engine.run_script(&mut session, script);
    assert_eq!(errors, 0, "fixture script must apply cleanly");
    session.add_view("top");
    session
}

#[test]
fn load_of_dump_reproduces_ids_names_and_resolved_properties() {
    let source = populated_session();
    let document = dump(&source, DumpOptions::default());

    let mut restored = Session::new();
    load(&mut restored, &document, LoadMode::Replace);

    let original = source.objects.find_by_name("sphere").expect("original");
    let reloaded = restored.objects.find_by_name("sphere").expect("reloaded");
    assert_eq!(reloaded.id(), original.id());
    assert_eq!(reloaded.name(), original.name());

    for key in ["colour", "opacity", "pointsize", "background"] {
        assert_eq!(
            restored.resolved(reloaded.id(), key),
            source.resolved(original.id(), key),
            "resolved `{key}` must survive the round-trip"
        );
    }

    assert_eq!(restored.figure_names(), source.figure_names());
    assert_eq!(
        restored.find_colourmap("heat").map(|map| map.colours()),
        source.find_colourmap("heat").map(|map| map.colours())
    );
    assert_eq!(
        restored.views().iter().map(|v| v.name()).collect::<Vec<_>>(),
        source.views().iter().map(|v| v.name()).collect::<Vec<_>>()
    );
}

#[test]
fn dumping_twice_without_mutation_is_byte_identical() {
    let session = populated_session();
    let first = dump_string(&session);
    let second = dump_string(&session);
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn dump_load_dump_is_stable() {
    let source = populated_session();
    let first = dump_string(&source);

    let mut restored = Session::new();
    load_string(&mut restored, &first, LoadMode::Replace).expect("load");
    let second = dump_string(&restored);

    assert_eq!(first, second);
}

#[test]
fn merge_mode_updates_matches_and_adds_new_entities() {
    let mut session = populated_session();

    let incoming = r#"{
        "options": {"background": "white"},
        "views": [{"name": "side", "properties": {"fov": 30}}],
        "models": [{
            "name": "default",
            "objects": [{"id": 1, "name": "sphere", "properties": {"colour": "green"}}]
        }]
    }"#;
    load_string(&mut session, incoming, LoadMode::Merge).expect("merge");

    // Matched entities were updated in place.
    let sphere = session.objects.find_by_name("sphere").expect("sphere");
    assert_eq!(
        sphere.properties.get("colour").and_then(PropertyValue::as_str),
        Some("green")
    );
    // Untouched keys and unmatched entities survive.
    assert_eq!(
        sphere
            .properties
            .get("opacity")
            .and_then(PropertyValue::as_float),
        Some(0.7)
    );
    assert!(session.find_colourmap("heat").is_some());
    // New view added alongside the existing ones.
    assert!(session.views().iter().any(|view| view.name() == "side"));
    assert!(session.views().iter().any(|view| view.name() == "top"));
}

#[test]
fn example_scenario_survives_save_and_restore_through_commands() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("scene.json");
    let path_str = path.to_str().expect("utf-8 temp path");

    // create object "sphere", colour it, add a view "top", save.
    let mut session = Session::new();
    let mut engine = CommandEngine::new();
    engine.execute(&mut session, "create sphere");
    engine.execute(&mut session, "sphere.colour=red");
    session.add_view("top");
    session
        .view_at_mut(1)
        .expect("top view")
        .properties
        .set("fov", 30.0);
    assert!(engine.execute(&mut session, &format!("save {path_str}")));
    assert!(path.exists());

    // Clear in-memory state, then restore from the dump.
    let mut fresh = Session::new();
    let mut fresh_engine = CommandEngine::new();
    assert!(fresh_engine.execute(&mut fresh, &format!("restore {path_str} replace")));

    let sphere = fresh.objects.find_by_name("sphere").expect("sphere back");
    assert_eq!(
        fresh
            .resolved(sphere.id(), "colour")
            .and_then(PropertyValue::as_str),
        Some("red")
    );
    let top = fresh
        .views()
        .iter()
        .find(|view| view.name() == "top")
        .expect("top view back");
    assert_eq!(
        top.properties.get("fov").and_then(PropertyValue::as_float),
        Some(30.0)
    );
}

#[test]
fn restore_from_missing_file_is_fatal_but_state_survives() {
    let mut session = populated_session();
    let mut engine = CommandEngine::new();

    let errors = engine.run_script(&mut session, "restore /nonexistent/state.json\ncreate after");
    // The fatal I/O error aborts the batch: `create after` never ran.
    assert_eq!(errors, 1);
    assert!(session.objects.find_by_name("after").is_none());
    // Applied state from before the failure is intact.
    assert!(session.objects.find_by_name("sphere").is_some());
}

#[test]
fn unresolvable_entries_are_skipped_and_the_rest_applies() {
    let mut session = Session::new();
    let incoming = r#"{
        "models": [{
            "name": "default",
            "objects": [
                {"id": 0, "name": "", "properties": {"colour": "red"}},
                {"id": 2, "name": "survivor", "properties": {"colour": "blue"}}
            ]
        }]
    }"#;
    let skipped = load_string(&mut session, incoming, LoadMode::Merge).expect("load");

    assert_eq!(skipped, 1);
    let survivor = session.objects.find_by_name("survivor").expect("survivor");
    assert_eq!(survivor.id().0, 2);
    assert_eq!(
        survivor
            .properties
            .get("colour")
            .and_then(PropertyValue::as_str),
        Some("blue")
    );
}
