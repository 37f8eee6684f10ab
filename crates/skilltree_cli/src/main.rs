//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `skilltree_core` linkage.
//! - Load one scope and print its graph dump and layout deterministically.
//!
//! Usage: `skilltree_cli [DB_PATH] [SCOPE_ID]`. Without a path the demo
//! scope is seeded into an in-memory database.

use skilltree_core::db::{open_db, open_db_in_memory};
use skilltree_core::{GraphEditor, SkillGateway, SkillNode, SqliteSkillRepository};
use std::process::ExitCode;

const DEMO_SCOPE_ID: &str = "demo";

fn main() -> ExitCode {
    println!("skilltree_core ping={}", skilltree_core::ping());
    println!("skilltree_core version={}", skilltree_core::core_version());

    let mut args = std::env::args().skip(1);
    let db_path = args.next();
    let scope_id = args.next().unwrap_or_else(|| DEMO_SCOPE_ID.to_string());

    match run(db_path.as_deref(), &scope_id) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(db_path: Option<&str>, scope_id: &str) -> Result<(), String> {
    let conn = match db_path {
        Some(path) => open_db(path),
        None => open_db_in_memory(),
    }
    .map_err(|err| err.to_string())?;
    let repo = SqliteSkillRepository::try_new(&conn).map_err(|err| err.to_string())?;

    if scope_id == DEMO_SCOPE_ID && repo.fetch_nodes(scope_id).is_err() {
        seed_demo_scope(&repo).map_err(|err| err.to_string())?;
    }

    let mut editor = GraphEditor::new(repo);
    editor.load(scope_id).map_err(|err| err.to_string())?;

    println!("scope={scope_id}");
    print!("{}", editor.dump_graph());
    for entry in editor.layout().entries() {
        println!(
            "layout node={} rank={} slot={} x={} y={}",
            entry.node_id, entry.rank, entry.slot, entry.x, entry.y
        );
    }
    println!("crossings={}", editor.layout().crossings());
    for issue in editor.validate() {
        println!("issue={issue}");
    }
    Ok(())
}

fn seed_demo_scope(repo: &SqliteSkillRepository<'_>) -> skilltree_core::GatewayResult<()> {
    repo.create_scope(DEMO_SCOPE_ID, "Demo")?;
    let nodes = [
        SkillNode::new("ollie", "Ollie").with_difficulty(1),
        SkillNode::new("shuvit", "Shuvit").with_difficulty(1),
        SkillNode::new("kickflip", "Kickflip")
            .with_difficulty(2)
            .with_prerequisites(["ollie"]),
        SkillNode::new("varial", "Varial flip")
            .with_difficulty(3)
            .with_prerequisites(["kickflip", "shuvit"]),
        SkillNode::new("treflip", "Tre flip")
            .with_difficulty(4)
            .with_prerequisites(["varial"]),
    ];
    for node in &nodes {
        repo.insert_skill(DEMO_SCOPE_ID, node)?;
    }
    Ok(())
}
