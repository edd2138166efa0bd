//! Integration Tests — End-to-End Memory Flows
//!
//! Full lifecycle scenarios across store, reflection, compaction and
//! persistence backends.

use std::convert::Infallible;
use std::sync::Arc;

use hearth_core::compaction;
use hearth_core::config::{HearthConfig, MemoryConfig, PersistenceConfig};
use hearth_core::persistence::{self, JsonFileStore, PersistentStore, SqliteStore};
use hearth_core::reflection;
use hearth_core::roster::Roster;
use hearth_core::store::MemoryStore;
use hearth_core::types::{CharacterId, MemoryEntry, MemoryLog};

fn turn(i: usize) -> MemoryEntry {
    MemoryEntry::dialogue(format!("question {i}"), format!("answer {i}"), "neutral")
}

// ---------------------------------------------------------------------------
// Five turns into an empty log produce one reflection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn five_turns_then_reflection() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = MemoryStore::new(JsonFileStore::open(dir.path()).expect("open"));
    let id = CharacterId::new("jace");

    for i in 1..=5 {
        let mut session = store.session(&id).await.expect("session");
        session.append(turn(i));
        if let Some(request) = reflection::plan(session.log(), 5, "Jace") {
            assert!(request.prompt().starts_with(reflection::REFLECT_INSTRUCTION));
            request.record(session.log_mut(), "Five voices in the dust.");
        }
        session.persist().expect("persist");
    }

    let log = store.load(&id).await.expect("load");
    assert_eq!(log.len(), 6);
    assert_eq!(log.last(), Some(&MemoryEntry::reflection("Five voices in the dust.")));
}

// ---------------------------------------------------------------------------
// 55 dialogue turns compact to 21 and survive a SQLite round trip
// ---------------------------------------------------------------------------

#[test]
fn compaction_then_sqlite_round_trip() {
    let config = MemoryConfig::default();
    let log: MemoryLog = (0..55).map(turn).collect();
    let tail = log.entries()[35..].to_vec();

    let mut prompts = Vec::new();
    let compacted = compaction::compact_with(log, &config, "Jace", |prompt| {
        prompts.push(prompt.to_string());
        Ok::<_, Infallible>("Outsiders ask too many questions.".to_string())
    })
    .expect("infallible");

    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].starts_with(compaction::SUMMARIZE_INSTRUCTION));
    assert!(prompts[0].contains("question 0"));
    assert!(prompts[0].contains("question 34"));
    assert!(!prompts[0].contains("question 35"));
    assert_eq!(compacted.len(), 21);
    assert_eq!(&compacted.entries()[1..], tail.as_slice());

    let dir = tempfile::tempdir().expect("tempdir");
    let sqlite = SqliteStore::open(dir.path().join("memory.db"), &PersistenceConfig::default())
        .expect("open");
    let id = CharacterId::new("jace");
    sqlite.save(&id, &compacted).expect("save");
    assert_eq!(sqlite.load(&id).expect("load"), Some(compacted));
}

// ---------------------------------------------------------------------------
// Backends selected from configuration are interchangeable
// ---------------------------------------------------------------------------

#[tokio::test]
async fn configured_backends_share_semantics() {
    let dir = tempfile::tempdir().expect("tempdir");
    let toml = format!(
        "[persistence]\nmemory_dir = {:?}\nsqlite_path = {:?}\n",
        dir.path().join("brains"),
        dir.path().join("brains.db"),
    );
    let mut config = HearthConfig::from_toml(&toml).expect("config");

    for backend in ["json", "sqlite", "memory"] {
        config.persistence.backend = backend.to_string();
        let store = MemoryStore::from_arc(Arc::from(
            persistence::open_backend(&config.persistence).expect("backend"),
        ));
        let id = CharacterId::new("martha");

        assert!(store.load(&id).await.expect("load").is_empty(), "{backend}");
        store.append(&id, turn(1)).await.expect("append");
        assert_eq!(store.like(&id, 0).await.expect("like"), 1, "{backend}");
        assert_eq!(store.characters().expect("list"), vec![id.clone()], "{backend}");
        assert!(store.reset(&id).await.expect("reset"), "{backend}");
    }
}

// ---------------------------------------------------------------------------
// Roster fallback never fails
// ---------------------------------------------------------------------------

#[test]
fn roster_sync_and_fallback() {
    let dir = tempfile::tempdir().expect("tempdir");
    let voices = dir.path().join("voices");
    std::fs::create_dir_all(&voices).expect("mkdir");
    std::fs::write(voices.join("jace.mp3"), b"riff").expect("write");

    let roster = Roster::load_and_sync(&dir.path().join("roster.json"), &voices, "mp3")
        .expect("roster");
    assert_eq!(
        roster.profile(&CharacterId::new("jace")).base_prompt,
        "You are Jace, a survivor in a post-collapse world."
    );
    assert_eq!(
        roster.profile(&CharacterId::new("stranger")).base_prompt,
        "You are Stranger, a survivor."
    );
}
