use rusqlite::Connection;
use skilltree_core::db::{open_db, open_db_in_memory};
use skilltree_core::{
    GatewayError, GraphBuildError, GraphEditor, LoadError, SkillGateway, SkillNode,
    SqliteSkillRepository,
};

fn seeded_repo(conn: &Connection) -> SqliteSkillRepository<'_> {
    let repo = SqliteSkillRepository::try_new(conn).unwrap();
    repo.create_scope("street", "Street").unwrap();
    repo.insert_skill("street", &SkillNode::new("ollie", "Ollie").with_difficulty(1))
        .unwrap();
    repo.insert_skill(
        "street",
        &SkillNode::new("kickflip", "Kickflip").with_prerequisites(["ollie"]),
    )
    .unwrap();
    repo.insert_skill(
        "street",
        &SkillNode::new("treflip", "Tre flip").with_prerequisites(["kickflip"]),
    )
    .unwrap();
    repo
}

#[test]
fn fetch_returns_scope_nodes_in_insertion_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = seeded_repo(&conn);

    let nodes = repo.fetch_nodes("street").unwrap();
    let ids: Vec<&str> = nodes.iter().map(|node| node.id.as_str()).collect();
    assert_eq!(ids, ["ollie", "kickflip", "treflip"]);
    assert_eq!(nodes[0].difficulty, Some(1));
    assert_eq!(nodes[0].prerequisite_ids, None);
    assert_eq!(nodes[1].prerequisites(), ["ollie"]);
}

#[test]
fn fetch_unknown_scope_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = seeded_repo(&conn);

    let err = repo.fetch_nodes("vert").unwrap_err();
    assert!(matches!(err, GatewayError::ScopeNotFound(id) if id == "vert"));
}

#[test]
fn empty_scope_fetches_no_nodes() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSkillRepository::try_new(&conn).unwrap();
    repo.create_scope("vert", "Vert").unwrap();

    assert!(repo.fetch_nodes("vert").unwrap().is_empty());
}

#[test]
fn update_replaces_list_and_empty_list_is_stored_as_null() {
    let conn = open_db_in_memory().unwrap();
    let repo = seeded_repo(&conn);

    repo.update_node_edges("treflip", &["kickflip".to_string(), "ollie".to_string()])
        .unwrap();
    let nodes = repo.fetch_nodes("street").unwrap();
    assert_eq!(nodes[2].prerequisites(), ["kickflip", "ollie"]);

    repo.update_node_edges("kickflip", &[]).unwrap();
    let raw: Option<String> = conn
        .query_row(
            "SELECT prerequisite_ids FROM skills WHERE skill_id = 'kickflip';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(raw, None);
}

#[test]
fn update_unknown_node_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = seeded_repo(&conn);

    let err = repo.update_node_edges("ghost", &[]).unwrap_err();
    assert!(matches!(err, GatewayError::NodeNotFound(id) if id == "ghost"));
}

#[test]
fn create_skill_generates_unique_ids() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSkillRepository::try_new(&conn).unwrap();
    repo.create_scope("flat", "Flatground").unwrap();

    let first = repo.create_skill("flat", " Manual ", Some(2)).unwrap();
    let second = repo.create_skill("flat", "Manual", None).unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(first.name, "Manual");

    let nodes = repo.fetch_nodes("flat").unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].id, first.id);
}

#[test]
fn insert_rejects_invalid_node_and_missing_scope() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSkillRepository::try_new(&conn).unwrap();

    let err = repo
        .insert_skill("nowhere", &SkillNode::new("a", "A"))
        .unwrap_err();
    assert!(matches!(err, GatewayError::ScopeNotFound(_)));

    repo.create_scope("flat", "Flatground").unwrap();
    let err = repo
        .insert_skill("flat", &SkillNode::new("has space", "A"))
        .unwrap_err();
    assert!(matches!(err, GatewayError::InvalidData(_)));
}

#[test]
fn corrupted_prerequisite_column_is_reported() {
    let conn = open_db_in_memory().unwrap();
    let repo = seeded_repo(&conn);
    conn.execute(
        "UPDATE skills SET prerequisite_ids = 'not json' WHERE skill_id = 'kickflip';",
        [],
    )
    .unwrap();

    let err = repo.fetch_nodes("street").unwrap_err();
    assert!(matches!(err, GatewayError::InvalidData(message) if message.contains("kickflip")));
}

#[test]
fn try_new_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteSkillRepository::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        GatewayError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
}

#[test]
fn cross_scope_prerequisite_fails_graph_load() {
    let conn = open_db_in_memory().unwrap();
    let repo = seeded_repo(&conn);
    repo.create_scope("vert", "Vert").unwrap();
    repo.insert_skill(
        "vert",
        &SkillNode::new("rock-to-fakie", "Rock to fakie").with_prerequisites(["ollie"]),
    )
    .unwrap();

    let mut editor = GraphEditor::new(repo);
    let err = editor.load("vert").unwrap_err();
    assert!(matches!(
        err,
        LoadError::Malformed(GraphBuildError::DanglingPrerequisite { .. })
    ));
}

#[test]
fn editor_round_trip_through_sqlite() {
    let conn = open_db_in_memory().unwrap();
    let mut editor = GraphEditor::new(seeded_repo(&conn));
    editor.load("street").unwrap();

    editor.add_edge("ollie", "treflip").unwrap();
    editor.remove_edge("ollie", "kickflip").unwrap();
    let result = editor.save();
    assert!(result.is_complete());
    assert_eq!(result.saved_count, 2);

    editor.load("street").unwrap();
    let graph = editor.graph().unwrap();
    assert!(graph.prerequisites("kickflip").is_empty());
    assert_eq!(graph.prerequisites("treflip"), ["kickflip", "ollie"]);
    assert_eq!(editor.layout().entry("treflip").unwrap().rank, 1);
}

#[test]
fn saved_edges_survive_reopening_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("skilltree.db");

    {
        let conn = open_db(&path).unwrap();
        let mut editor = GraphEditor::new(seeded_repo(&conn));
        editor.load("street").unwrap();
        editor.add_edge("ollie", "treflip").unwrap();
        assert!(editor.save().is_complete());
    }

    let conn = open_db(&path).unwrap();
    let repo = SqliteSkillRepository::try_new(&conn).unwrap();
    let nodes = repo.fetch_nodes("street").unwrap();
    let treflip = nodes.iter().find(|node| node.id == "treflip").unwrap();
    assert_eq!(treflip.prerequisites(), ["kickflip", "ollie"]);
}
