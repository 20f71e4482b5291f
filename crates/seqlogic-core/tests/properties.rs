use seqlogic_core::{
    CollectingNotifier, Coordinate, Diagram, DiagramError, DiagramServices, DiagramStorage,
    FixedTime, Node, Powered, SequentialIds, Text, Viewport, Wire, MAX_CLOCK_DURATION,
};

fn services(seed: u64) -> (DiagramServices, CollectingNotifier) {
    let notifier = CollectingNotifier::new();
    let services = DiagramServices::seeded(seed)
        .with_notifier(notifier.clone())
        .with_ids(SequentialIds::new("n"))
        .with_time(FixedTime(0.0));
    (services, notifier)
}

fn node(x: f64, powered: bool) -> Node {
    Node::new(Coordinate::new(x, 0.0), Powered::Fixed(powered))
}

fn load(storage: DiagramStorage) -> (Diagram, CollectingNotifier) {
    let (services, notifier) = services(5);
    (Diagram::with_services(storage, services), notifier)
}

/// Run ticks until nothing is pending. Returns the number of ticks taken.
fn settle(diagram: &mut Diagram, limit: usize) -> Option<usize> {
    for ticks in 0..=limit {
        if diagram.pending_toggles() == 0 {
            return Some(ticks);
        }
        diagram.next_tick();
    }
    None
}

#[test]
fn storage_roundtrips_through_diagram() {
    let mut storage = DiagramStorage::blank();
    storage.nodes.insert("a".into(), node(0.0, true));
    storage.nodes.insert(
        "b".into(),
        Node::new(
            Coordinate::new(5.0, 5.0),
            Powered::Oscillating {
                offset: 10.0,
                duration: 250.0,
            },
        ),
    );
    storage.nodes.insert("c".into(), node(9.0, false));
    storage.wires.insert("ab".into(), Wire::short("a", "b"));
    storage.wires.insert("bc".into(), Wire::inverter("b", "c"));
    storage.texts.insert(
        "t".into(),
        Text::new(Coordinate::new(1.0, 2.0), "clock", 1.5),
    );
    storage.viewport = Viewport {
        x: -40.0,
        y: 12.0,
        scale: 2.0,
    };

    let (diagram, notifier) = load(storage.clone());

    assert_eq!(diagram.to_storage(), storage);
    assert!(notifier.messages().is_empty());
}

#[test]
fn undo_and_redo_restore_exact_mappings() {
    let mut storage = DiagramStorage::blank();
    storage.nodes.insert("a".into(), node(0.0, false));
    storage.nodes.insert("b".into(), node(1.0, false));
    storage.wires.insert("w".into(), Wire::short("a", "b"));
    let (mut diagram, _) = load(storage);

    let before = diagram.to_storage();

    let c = diagram.add_node(node(2.0, true)).unwrap();
    diagram.add_wire(Wire::inverter("b", &c)).unwrap();
    diagram.update_node("a", node(7.0, true)).unwrap();
    diagram.remove_wire("w").unwrap();
    diagram.add_text(Text::new(Coordinate::default(), "note", 1.0)).unwrap();
    assert!(diagram.commit());
    let after = diagram.to_storage();

    assert_eq!(diagram.undo(), Ok(true));
    assert_eq!(diagram.nodes().to_map(), before.nodes);
    assert_eq!(diagram.wires().to_map(), before.wires);
    assert_eq!(diagram.texts().to_map(), before.texts);

    assert_eq!(diagram.redo(), Ok(true));
    assert_eq!(diagram.nodes().to_map(), after.nodes);
    assert_eq!(diagram.wires().to_map(), after.wires);
    assert_eq!(diagram.texts().to_map(), after.texts);
}

#[test]
fn second_commit_fails_without_mutation() {
    let (mut diagram, notifier) = load(DiagramStorage::blank());
    diagram.add_node(node(0.0, false)).unwrap();
    assert!(diagram.commit());
    let snapshot = diagram.to_storage();
    let head = diagram.nodes().head();

    assert!(!diagram.commit());

    assert_eq!(diagram.to_storage(), snapshot);
    assert_eq!(diagram.nodes().head(), head);
    assert_eq!(notifier.messages(), vec!["No changes to commit"]);
}

#[test]
fn direct_wires_share_power() {
    let mut storage = DiagramStorage::blank();
    storage.nodes.insert("a".into(), node(0.0, false));
    storage.nodes.insert("b".into(), node(1.0, true));
    storage.nodes.insert("c".into(), node(2.0, false));
    storage.nodes.insert("d".into(), node(3.0, false));
    storage.wires.insert("ab".into(), Wire::short("a", "b"));
    storage.wires.insert("bc".into(), Wire::short("b", "c"));
    let (mut diagram, _) = load(storage);

    assert_eq!(diagram.group_count(), 2);
    for id in ["a", "b", "c"] {
        assert!(diagram.node_status(id).unwrap().powered, "{id} unpowered");
    }
    assert!(!diagram.node_status("d").unwrap().powered);

    assert!(settle(&mut diagram, 32).is_some());
    for id in ["a", "b", "c"] {
        assert!(diagram.is_active(id), "{id} inactive");
    }
    assert!(!diagram.is_active("d"));
}

#[test]
fn inverter_loop_never_settles() {
    let mut storage = DiagramStorage::blank();
    storage.nodes.insert("a".into(), node(0.0, false));
    storage.nodes.insert("b".into(), node(1.0, false));
    storage.nodes.insert("c".into(), node(2.0, false));
    storage.wires.insert("ab".into(), Wire::short("a", "b"));
    storage.wires.insert("bc".into(), Wire::short("b", "c"));
    // feeds the group back into itself through an inverter
    storage.wires.insert("ca".into(), Wire::inverter("c", "a"));
    let (mut diagram, _) = load(storage);

    let mut flips = 0;
    for _ in 0..200 {
        assert!(diagram.pending_toggles() > 0);
        flips += diagram.next_tick();
    }
    assert!(flips >= 40, "only {flips} flips");
}

#[test]
fn inverter_chain_settles_within_bound() {
    const LEN: usize = 12;
    let mut storage = DiagramStorage::blank();
    for i in 0..LEN {
        storage
            .nodes
            .insert(format!("n{i}"), node(i as f64, i == 0));
    }
    for i in 1..LEN {
        storage.wires.insert(
            format!("w{i}"),
            Wire::inverter(format!("n{}", i - 1), format!("n{i}")),
        );
    }
    let (mut diagram, _) = load(storage);

    let ticks = settle(&mut diagram, 4 * (LEN + 1));
    assert!(ticks.is_some(), "chain did not settle");
    for i in 0..LEN {
        assert_eq!(diagram.is_active(&format!("n{i}")), i % 2 == 0, "n{i}");
    }
}

#[test]
fn self_loop_and_duplicate_wires_are_ignored() {
    let (mut diagram, notifier) = load(DiagramStorage::blank());
    let a = diagram.add_node(node(0.0, false)).unwrap();
    let b = diagram.add_node(node(1.0, false)).unwrap();
    diagram.add_wire(Wire::short(&a, &b)).unwrap();
    diagram.commit();
    let wires = diagram.wires().to_map();

    assert_eq!(diagram.add_wire(Wire::inverter(&a, &a)), Ok(None));
    assert_eq!(diagram.add_wire(Wire::short(&a, &b)), Ok(None));
    assert_eq!(diagram.add_wire(Wire::inverter(&b, &a)), Ok(None));

    assert_eq!(diagram.wires().to_map(), wires);
    assert!(!diagram.has_uncommitted());
    assert!(notifier.messages().is_empty());
}

#[test]
fn removing_node_and_invalid_wires() {
    let mut storage = DiagramStorage::blank();
    for (i, id) in ["a", "b", "c"].into_iter().enumerate() {
        storage.nodes.insert(id.into(), node(i as f64, false));
    }
    storage.wires.insert("ab".into(), Wire::short("a", "b"));
    storage.wires.insert("bc".into(), Wire::inverter("b", "c"));
    storage.wires.insert("ac".into(), Wire::short("a", "c"));
    let (mut diagram, _) = load(storage);

    assert_eq!(
        diagram.remove_node("ghost"),
        Err(DiagramError::NodeNotFound("ghost".into()))
    );

    diagram.remove_node("b").unwrap();
    assert_eq!(diagram.wires().len(), 3);
    assert_eq!(diagram.remove_invalid_wires(), 2);
    assert_eq!(diagram.wires().keys().collect::<Vec<_>>(), vec!["ac"]);
    assert!(diagram.commit());
}

#[test]
fn unpowering_a_precursor_turns_its_successor_on() {
    let mut storage = DiagramStorage::blank();
    storage.nodes.insert("a".into(), node(0.0, true));
    storage.nodes.insert("b".into(), node(1.0, false));
    storage.wires.insert("ab".into(), Wire::inverter("a", "b"));
    let (mut diagram, _) = load(storage);

    assert!(diagram.is_active("a"));
    assert!(!diagram.is_active("b"));
    assert_eq!(diagram.pending_toggles(), 0);

    diagram.update_node("a", node(0.0, false)).unwrap();
    assert!(diagram.commit());
    assert_eq!(diagram.pending_toggles(), 1);

    assert!(settle(&mut diagram, 16).is_some());
    assert!(!diagram.is_active("a"));
    assert!(diagram.is_active("b"));
}

#[test]
fn edited_diagram_always_reloads() {
    let (mut diagram, _) = load(DiagramStorage::blank());
    let slow = Powered::Oscillating {
        offset: 0.0,
        duration: MAX_CLOCK_DURATION * 2.0,
    };

    assert!(diagram
        .add_node(Node::new(Coordinate::default(), slow))
        .is_err());
    diagram.add_node(node(0.0, true)).unwrap();
    assert!(diagram.commit());
    assert!(diagram
        .set_viewport(Viewport {
            x: 0.0,
            y: 0.0,
            scale: 0.0,
        })
        .is_err());

    let saved = diagram.to_storage();
    let (reloaded, notifier) = load(saved.clone());

    assert_eq!(reloaded.to_storage(), saved);
    assert_eq!(reloaded.nodes().len(), 1);
    assert!(notifier.messages().is_empty());
}
