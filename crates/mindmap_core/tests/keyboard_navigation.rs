use mindmap_core::{
    interpret, CoreConfig, Edge, InputContext, MindMapClient, NavAction, NavKey, Node,
    TreeSnapshot,
};
use std::time::Instant;

fn editor_with_three_children() -> MindMapClient {
    let snapshot = TreeSnapshot::new(
        vec![
            Node::with_id("r", "root"),
            Node::with_id("a", "a"),
            Node::with_id("b", "b"),
            Node::with_id("c", "c"),
            Node::with_id("b1", "b1"),
        ],
        vec![
            Edge::between("r", "a"),
            Edge::between("r", "b"),
            Edge::between("r", "c"),
            Edge::between("b", "b1"),
        ],
    );
    MindMapClient::editor(snapshot, &CoreConfig::default())
}

#[test]
fn first_arrow_selects_first_root() {
    let mut client = editor_with_three_children();
    let focus = client.handle_key(NavKey::Down, Instant::now()).unwrap();
    assert_eq!(focus.node_id, "r");
    assert_eq!(client.snapshot().selected_id(), Some("r"));
}

#[test]
fn arrows_walk_the_visible_tree() {
    let mut client = editor_with_three_children();
    let now = Instant::now();
    client.handle_key(NavKey::Down, now);

    let walk = [
        (NavKey::Right, "b"),
        (NavKey::Right, "b1"),
        (NavKey::Left, "b"),
        (NavKey::Down, "c"),
        (NavKey::Up, "b"),
        (NavKey::Up, "a"),
        (NavKey::Left, "r"),
    ];
    for (key, expected) in walk {
        let focus = client.handle_key(key, now).unwrap();
        assert_eq!(focus.node_id, expected, "after {key:?}");
        assert_eq!(client.snapshot().selected_id(), Some(expected));
        assert_eq!(
            client.take_focus_request().map(|request| request.node_id),
            Some(expected.to_string())
        );
    }
}

#[test]
fn boundary_moves_keep_selection() {
    let mut client = editor_with_three_children();
    let now = Instant::now();
    client.handle_key(NavKey::Down, now);
    client.handle_key(NavKey::Right, now);
    client.handle_key(NavKey::Down, now);
    assert_eq!(client.snapshot().selected_id(), Some("c"));

    assert!(client.handle_key(NavKey::Down, now).is_none());
    assert!(client.handle_key(NavKey::Right, now).is_none());
    assert_eq!(client.snapshot().selected_id(), Some("c"));
}

#[test]
fn space_opens_rename_and_blocks_navigation() {
    let mut client = editor_with_three_children();
    let now = Instant::now();
    client.handle_key(NavKey::Down, now);
    client.handle_key(NavKey::Space, now);
    assert_eq!(client.rename_target(), Some("r"));

    assert!(client.handle_key(NavKey::Right, now).is_none());
    assert_eq!(client.snapshot().selected_id(), Some("r"));

    client.cancel_rename();
    assert_eq!(client.handle_key(NavKey::Right, now).unwrap().node_id, "b");
}

#[test]
fn delete_key_removes_selected_subtree() {
    let mut client = editor_with_three_children();
    let now = Instant::now();
    client.handle_key(NavKey::Down, now);
    client.handle_key(NavKey::Right, now);

    let focus = client.handle_key(NavKey::Backspace, now).unwrap();
    assert_eq!(focus.node_id, "r");
    assert!(!client.snapshot().contains("b"));
    assert!(!client.snapshot().contains("b1"));
    assert_eq!(client.snapshot().nodes.len(), 3);
}

#[test]
fn hidden_children_are_not_navigable() {
    let mut client = editor_with_three_children();
    let now = Instant::now();
    client.handle_key(NavKey::Down, now);
    client.execute(mindmap_core::Command::ToggleExpand("r".to_string()), now);

    assert!(client.handle_key(NavKey::Right, now).is_none());
    let context = InputContext::default();
    assert_eq!(
        interpret(client.snapshot(), NavKey::Right, context),
        NavAction::Ignored
    );
}
