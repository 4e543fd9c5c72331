//! End-to-end integration tests for Pathlock.
//!
//! These tests verify complete flows work correctly:
//! - Session startup from configuration
//! - Lock lifecycle across sessions
//! - Conditional visibility driven by the rule file
//! - Recovery from damaged or unwritable lock files

use std::fs;
use std::path::{Path, PathBuf};

use engine::{Engine, LockKind, LockPersistence, LockState, PathStyle, UnlockResult};
use explorer::config::Config;
use explorer::files::{DirectoryBrowser, TreeBuilder};
use explorer::session::{Outcome, Session};
use explorer::storage::{LockFileStore, PERMANENT_LOCKS_FILE, TEMPORARY_LOCKS_FILE};
use tempfile::TempDir;

/// Create a test configuration with a populated root and an empty data dir.
fn create_test_config(rules: &str) -> (Config, PathBuf, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("root");
    let data = temp_dir.path().join("data");

    fs::create_dir_all(root.join("projects/alpha")).unwrap();
    fs::create_dir_all(root.join("archive")).unwrap();
    fs::create_dir_all(&data).unwrap();
    for name in ["a.txt", "b.txt", "c.txt", "d.txt", "e.txt"] {
        fs::write(root.join(name), name).unwrap();
    }
    fs::write(root.join("projects/plan.txt"), "plan").unwrap();
    fs::write(root.join("projects/alpha/notes.txt"), "notes").unwrap();
    fs::write(root.join("archive/old.txt"), "old").unwrap();
    fs::write(root.join(".dotfile"), "dot").unwrap();
    fs::write(data.join("statements.txt"), rules).unwrap();

    let mut config = Config::default();
    config.explorer.root_dir = Some(root);
    config.explorer.data_dir = data;
    let config_path = temp_dir.path().join("config.toml");
    (config, config_path, temp_dir)
}

fn run(session: &mut Session, line: &str) -> String {
    match session.execute_line(line) {
        Outcome::Continue(text) => text,
        Outcome::Quit => panic!("unexpected quit on {line:?}"),
    }
}

fn listed(session: &mut Session, dir: &str) -> Vec<String> {
    run(session, &format!("ls {dir}"))
        .lines()
        .map(|line| line.split(' ').next().unwrap_or_default().to_string())
        .collect()
}

// =============================================================================
// Session Lifecycle Tests
// =============================================================================

#[test]
fn test_session_starts_with_no_lock_files() {
    let (config, config_path, temp) = create_test_config("");
    let mut session = Session::open(config, config_path).unwrap();

    let names = listed(&mut session, ".");
    assert_eq!(
        names,
        vec!["archive/", "projects/", "a.txt", "b.txt", "c.txt", "d.txt", "e.txt"]
    );
    assert!(!temp.path().join("data").join(PERMANENT_LOCKS_FILE).exists());
}

#[test]
fn test_dotfiles_shown_when_configured() {
    let (mut config, config_path, _temp) = create_test_config("");
    config.browse.show_dotfiles = true;
    let mut session = Session::open(config, config_path).unwrap();
    assert!(listed(&mut session, ".").contains(&".dotfile".to_string()));
}

#[test]
fn test_missing_rule_file_means_no_rules() {
    let (config, config_path, temp) = create_test_config("");
    fs::remove_file(temp.path().join("data/statements.txt")).unwrap();
    let mut session = Session::open(config, config_path).unwrap();
    assert_eq!(run(&mut session, "rules"), "no rules loaded");
}

// =============================================================================
// Lock Lifecycle Tests
// =============================================================================

#[test]
fn test_permanent_unlock_lasts_for_session_only() {
    let (config, config_path, _temp) = create_test_config("");
    let mut session = Session::open(config.clone(), config_path.clone()).unwrap();

    run(&mut session, "lock projects secret");
    assert!(run(&mut session, "tree").contains("projects/ [🔒] (locked)"));

    assert_eq!(run(&mut session, "unlock projects secret"), "unlocked projects");
    let tree = run(&mut session, "tree");
    assert!(tree.contains("projects/ [🔑]"));
    assert!(tree.contains("notes.txt"));
    drop(session);

    let session = Session::open(config, config_path).unwrap();
    assert_eq!(
        session.engine().lock_state("projects"),
        LockState::LockedPermanent
    );
    assert!(!session.engine().is_accessible("projects/alpha/notes.txt"));
}

#[test]
fn test_temporary_lock_consumed_once() {
    let (config, config_path, temp) = create_test_config("");
    let mut session = Session::open(config.clone(), config_path.clone()).unwrap();

    run(&mut session, "templock archive once");
    assert!(run(&mut session, "tree").contains("archive/ [🔒TEMP] (locked)"));
    assert_eq!(run(&mut session, "unlock archive nope"), "wrong password for archive");
    assert_eq!(run(&mut session, "unlock archive once"), "unlocked archive");
    assert_eq!(run(&mut session, "unlock archive once"), "archive is not locked");

    let raw = fs::read_to_string(temp.path().join("data").join(TEMPORARY_LOCKS_FILE)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(value.as_object().unwrap().is_empty());

    let session = Session::open(config, config_path).unwrap();
    assert!(session.engine().is_accessible("archive/old.txt"));
}

#[test]
fn test_nested_locks_need_every_ancestor_open() {
    let (config, config_path, _temp) = create_test_config("");
    let mut session = Session::open(config, config_path).unwrap();

    run(&mut session, "lock projects outer");
    run(&mut session, "lock projects/alpha inner");
    run(&mut session, "unlock projects/alpha inner");
    assert!(!session.engine().is_accessible("projects/alpha/notes.txt"));

    run(&mut session, "unlock projects outer");
    assert!(session.engine().is_accessible("projects/alpha/notes.txt"));

    run(&mut session, "relock projects");
    assert!(!session.engine().is_accessible("projects/plan.txt"));
}

// =============================================================================
// Rule Tests
// =============================================================================

#[test]
fn test_rule_file_drives_visibility() {
    let rules = "\
# reveal chain
HIDE e.txt
IF a.txt IS UNLOCKED, SHOW b.txt.
IF a.txt AND c.txt IS UNLOCKED, SHOW d.txt.
";
    let (config, config_path, _temp) = create_test_config(rules);
    let mut session = Session::open(config, config_path).unwrap();
    run(&mut session, "lock a.txt pa");
    run(&mut session, "lock c.txt pc");

    let names = listed(&mut session, ".");
    assert!(!names.contains(&"b.txt".to_string()));
    assert!(!names.contains(&"d.txt".to_string()));
    assert!(!names.contains(&"e.txt".to_string()));

    run(&mut session, "unlock a.txt pa");
    let names = listed(&mut session, ".");
    assert!(names.contains(&"b.txt".to_string()));
    assert!(!names.contains(&"d.txt".to_string()));

    run(&mut session, "unlock c.txt pc");
    assert!(listed(&mut session, ".").contains(&"d.txt".to_string()));
    assert!(!listed(&mut session, ".").contains(&"e.txt".to_string()));
}

#[test]
fn test_folder_qualified_rule() {
    let (config, config_path, _temp) =
        create_test_config("IF a.txt IS UNLOCKED, SHOW notes.txt IN projects/alpha.\n");
    let mut session = Session::open(config, config_path).unwrap();
    assert_eq!(listed(&mut session, "projects/alpha"), vec!["notes.txt"]);

    run(&mut session, "lock a.txt pa");
    assert!(listed(&mut session, "projects/alpha").is_empty());
}

#[test]
fn test_bad_rule_lines_are_skipped() {
    let (config, config_path, temp) = create_test_config("");
    let mut session = Session::open(config, config_path).unwrap();

    fs::write(
        temp.path().join("data/statements.txt"),
        "IF a.txt IS OPEN, SHOW b.txt.\nHIDE c.txt\n",
    )
    .unwrap();
    let report = run(&mut session, "reload");
    assert!(report.starts_with("1 rules loaded"));
    assert!(report.contains("line 1"));
    assert!(!listed(&mut session, ".").contains(&"c.txt".to_string()));
}

// =============================================================================
// Persistence Failure Tests
// =============================================================================

#[test]
fn test_corrupt_lock_file_starts_empty() {
    let (config, config_path, temp) = create_test_config("");
    fs::write(temp.path().join("data").join(PERMANENT_LOCKS_FILE), "{{{").unwrap();

    let session = Session::open(config, config_path).unwrap();
    assert!(session.engine().is_accessible("a.txt"));
}

#[test]
fn test_unwritable_data_dir_keeps_session_state() {
    let (mut config, config_path, temp) = create_test_config("");
    let blocker = temp.path().join("not-a-dir");
    fs::write(&blocker, "x").unwrap();
    config.explorer.data_dir = blocker;

    let mut session = Session::open(config, config_path).unwrap();
    let out = run(&mut session, "lock a.txt pw");
    assert!(out.contains("warning:"));
    assert!(!session.engine().is_accessible("a.txt"));
    assert!(session.engine().has_unsaved_changes());
}

// =============================================================================
// Engine over the Filesystem
// =============================================================================

#[test]
fn test_engine_with_directory_browser() {
    let (_config, _config_path, temp) = create_test_config("");
    let browser = DirectoryBrowser::new(temp.path().join("root")).unwrap();
    let root = browser.root().to_path_buf();
    let store = LockFileStore::new(temp.path().join("data"));

    let mut engine = Engine::new(&root, PathStyle::Posix, browser, &store);
    engine.set_temporary_lock("projects", "t");
    engine.save_pending().unwrap();
    assert_eq!(store.load(LockKind::Temporary).unwrap().len(), 1);

    let tree = TreeBuilder::new(4).build(&engine, Path::new(&root));
    let projects = tree.child("projects").unwrap();
    assert!(projects.children.is_empty());

    assert_eq!(engine.attempt_unlock("projects", "t"), UnlockResult::Unlocked);
    let tree = TreeBuilder::new(4).build(&engine, &root);
    assert_eq!(tree.child("projects").unwrap().children.len(), 2);
}
