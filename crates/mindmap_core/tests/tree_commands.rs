use mindmap_core::{
    apply_command, resolve, Command, CommandProcessor, Edge, Node, TreeSnapshot,
};
use proptest::prelude::*;
use std::collections::HashSet;

fn root_only() -> TreeSnapshot {
    let mut root = Node::with_id("R", "Root");
    root.selected = true;
    TreeSnapshot::with_root(root)
}

fn selected(snapshot: &TreeSnapshot) -> String {
    snapshot.selected_id().unwrap().to_string()
}

#[test]
fn scripted_editing_session() {
    let processor = CommandProcessor::default();

    let outcome = processor.apply(root_only(), &Command::AddChild);
    assert!(outcome.changed);
    let first = selected(&outcome.snapshot);
    assert_ne!(first, "R");
    assert_eq!(outcome.snapshot.nodes.len(), 2);
    assert_eq!(outcome.snapshot.edges.len(), 1);

    let outcome = processor.apply(outcome.snapshot, &Command::AddSibling);
    let second = selected(&outcome.snapshot);
    assert_eq!(outcome.snapshot.nodes.len(), 3);
    assert_eq!(outcome.snapshot.edges.len(), 2);
    assert_eq!(outcome.snapshot.children_of("R"), vec![first.as_str(), second.as_str()]);

    let outcome = processor.apply(outcome.snapshot, &Command::ToggleExpand("R".to_string()));
    {
        let resolved = resolve(&outcome.snapshot);
        assert!(resolved.is_hidden(&first));
        assert!(resolved.is_hidden(&second));
        assert!(resolved.is_visible("R"));
    }

    let outcome = processor.apply(outcome.snapshot, &Command::Select("R".to_string()));
    let outcome = processor.apply(outcome.snapshot, &Command::DeleteSelected);
    assert!(!outcome.changed);
    assert_eq!(outcome.snapshot.nodes.len(), 3);

    let outcome = processor.apply(outcome.snapshot, &Command::ToggleExpand("R".to_string()));
    let outcome = processor.apply(outcome.snapshot, &Command::Select(first.clone()));
    let outcome = processor.apply(outcome.snapshot, &Command::DeleteSelected);
    assert!(outcome.changed);
    let ids: HashSet<&str> = outcome
        .snapshot
        .nodes
        .iter()
        .map(|node| node.id.as_str())
        .collect();
    assert_eq!(ids, HashSet::from(["R", second.as_str()]));
    assert_eq!(outcome.snapshot.selected_id(), Some("R"));
    assert_eq!(outcome.focus.as_deref(), Some("R"));
}

#[test]
fn cascading_delete_removes_exact_subtree() {
    let mut snapshot = TreeSnapshot::new(
        vec![
            Node::with_id("r", "root"),
            Node::with_id("x", "x"),
            Node::with_id("x1", "x1"),
            Node::with_id("x2", "x2"),
            Node::with_id("x21", "x21"),
            Node::with_id("y", "y"),
        ],
        vec![
            Edge::between("r", "x"),
            Edge::between("x", "x1"),
            Edge::between("x", "x2"),
            Edge::between("x2", "x21"),
            Edge::between("r", "y"),
        ],
    );
    snapshot.nodes[1].selected = true;

    let outcome = apply_command(snapshot, &Command::DeleteSelected);
    let ids: Vec<&str> = outcome
        .snapshot
        .nodes
        .iter()
        .map(|node| node.id.as_str())
        .collect();
    assert_eq!(ids, vec!["r", "y"]);
    assert_eq!(outcome.snapshot.edges, vec![Edge::between("r", "y")]);
    outcome.snapshot.validate().unwrap();
}

#[test]
fn root_protection_applies_to_every_root() {
    let mut snapshot = TreeSnapshot::new(
        vec![Node::with_id("a", "a"), Node::with_id("b", "b")],
        Vec::new(),
    );
    snapshot.nodes[1].selected = true;

    let outcome = apply_command(snapshot.clone(), &Command::DeleteSelected);
    assert!(!outcome.changed);
    assert_eq!(outcome.snapshot, snapshot);
}

#[test]
fn commands_without_selection_are_no_ops() {
    let snapshot = TreeSnapshot::with_root(Node::with_id("R", "Root"));
    for command in [Command::AddChild, Command::AddSibling, Command::DeleteSelected] {
        let outcome = apply_command(snapshot.clone(), &command);
        assert!(!outcome.changed, "{} should be a no-op", command.name());
        assert_eq!(outcome.snapshot, snapshot);
    }
}

#[test]
fn sibling_of_root_is_a_new_root() {
    let outcome = apply_command(root_only(), &Command::AddSibling);
    let created = selected(&outcome.snapshot);
    assert!(outcome.snapshot.edges.is_empty());
    assert_eq!(outcome.snapshot.roots(), vec!["R", created.as_str()]);
}

#[test]
fn rename_normalizes_and_ignores_blank_labels() {
    let outcome = apply_command(
        root_only(),
        &Command::Rename {
            node_id: "R".to_string(),
            label: "  Career \t goals ".to_string(),
        },
    );
    assert!(outcome.changed);
    assert_eq!(outcome.snapshot.node("R").unwrap().label, "Career goals");

    let outcome = apply_command(
        outcome.snapshot,
        &Command::Rename {
            node_id: "R".to_string(),
            label: "   ".to_string(),
        },
    );
    assert!(!outcome.changed);
    assert_eq!(outcome.snapshot.node("R").unwrap().label, "Career goals");
}

#[test]
fn toggle_expand_keeps_selection_on_hidden_descendant() {
    let processor = CommandProcessor::default();
    let outcome = processor.apply(root_only(), &Command::AddChild);
    let child = selected(&outcome.snapshot);
    let outcome = processor.apply(outcome.snapshot, &Command::AddChild);
    let grandchild = selected(&outcome.snapshot);

    let outcome = processor.apply(outcome.snapshot, &Command::ToggleExpand("R".to_string()));
    assert!(outcome.changed);
    assert!(outcome.focus.is_none());
    assert!(resolve(&outcome.snapshot).is_hidden(&grandchild));
    assert_eq!(outcome.snapshot.selected_id(), Some(grandchild.as_str()));

    let outcome = processor.apply(outcome.snapshot, &Command::ToggleExpand(child));
    assert_eq!(outcome.snapshot.selected_id(), Some(grandchild.as_str()));

    let outcome = processor.apply(outcome.snapshot, &Command::ToggleExpand("R".to_string()));
    assert_eq!(outcome.snapshot.selected_id(), Some(grandchild.as_str()));
    assert!(resolve(&outcome.snapshot).is_hidden(&grandchild));
}

/// Command shape with a target resolved against the live snapshot.
#[derive(Debug, Clone)]
enum Step {
    AddChild,
    AddSibling,
    DeleteSelected,
    ToggleExpand(usize),
    Select(usize),
    Rename(usize, String),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        2 => Just(Step::AddChild),
        1 => Just(Step::AddSibling),
        1 => Just(Step::DeleteSelected),
        1 => any::<usize>().prop_map(Step::ToggleExpand),
        1 => any::<usize>().prop_map(Step::Select),
        1 => (any::<usize>(), "[a-z ]{0,12}").prop_map(|(slot, label)| Step::Rename(slot, label)),
    ]
}

fn to_command(snapshot: &TreeSnapshot, step: &Step) -> Command {
    let target = |slot: &usize| snapshot.nodes[slot % snapshot.nodes.len()].id.clone();
    match step {
        Step::AddChild => Command::AddChild,
        Step::AddSibling => Command::AddSibling,
        Step::DeleteSelected => Command::DeleteSelected,
        Step::ToggleExpand(slot) => Command::ToggleExpand(target(slot)),
        Step::Select(slot) => Command::Select(target(slot)),
        Step::Rename(slot, label) => Command::Rename {
            node_id: target(slot),
            label: label.clone(),
        },
    }
}

proptest! {
    #[test]
    fn forest_and_single_selection_hold_for_command_streams(
        steps in prop::collection::vec(step_strategy(), 1..120)
    ) {
        let processor = CommandProcessor::default();
        let mut snapshot = root_only();

        for step in &steps {
            let command = to_command(&snapshot, step);
            let before = snapshot.clone();
            let outcome = processor.apply(snapshot, &command);
            if !outcome.changed {
                prop_assert_eq!(&outcome.snapshot, &before);
            }
            snapshot = outcome.snapshot;

            prop_assert!(snapshot.validate().is_ok());
            prop_assert!(snapshot.nodes.iter().filter(|node| node.selected).count() <= 1);
            prop_assert!(snapshot.contains("R"));
            for edge in &snapshot.edges {
                prop_assert!(snapshot.contains(&edge.source) && snapshot.contains(&edge.target));
            }
        }
    }
}
