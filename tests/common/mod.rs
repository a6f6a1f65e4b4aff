//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use keeldb::{Database, OpenMode, PutMode};
use serde_json::{json, Value};
use tempfile::TempDir;
use uuid::Uuid;

pub const FIRST_NAMES: [&str; 12] = [
    "Ava", "Brock", "Celia", "Dante", "Edith", "Fern", "Gus", "Hattie", "Ivan", "June", "Kirby",
    "Lena",
];

pub const LAST_NAMES: [&str; 7] = ["Park", "Moss", "Vance", "Ortiz", "Quinn", "Hale", "Reyes"];

/// A person document keyed by its guid
pub struct Person {
    pub guid: String,
    pub doc: Value,
}

/// `count` people with random guids. Person 11 is always "Dollie Reyes".
pub fn people(count: usize) -> Vec<Person> {
    (0..count)
        .map(|i| {
            let guid = Uuid::new_v4().to_string();
            let name = if i == 11 {
                "Dollie Reyes".to_string()
            } else {
                format!(
                    "{} {}",
                    FIRST_NAMES[i % FIRST_NAMES.len()],
                    LAST_NAMES[i % LAST_NAMES.len()]
                )
            };
            let doc = json!({
                "guid": guid,
                "index": i,
                "name": name,
                "age": 20 + (i % 50),
                "isActive": i % 3 == 0,
                "about": format!("Person number {} in the fixture set.", i),
                "tags": ["fixture", format!("group{}", i % 10)],
            });
            Person { guid, doc }
        })
        .collect()
}

pub struct TestDb {
    pub dir: TempDir,
    pub path: PathBuf,
    pub names: Vec<String>,
}

impl TestDb {
    /// Empty database in a fresh temp directory
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("people.keel");
        drop(Database::open(&path, OpenMode::CreateAndWrite).unwrap());
        Self {
            dir,
            path,
            names: Vec::new(),
        }
    }

    pub fn open(&self, mode: OpenMode) -> Database {
        Database::open(&self.path, mode).unwrap()
    }

    /// Inserts `count` people and commits. Returns the checkpoint.
    pub fn populate(&mut self, count: usize) -> u64 {
        let mut db = self.open(OpenMode::Write);
        for person in people(count) {
            assert!(db
                .put_document(person.guid.as_bytes(), &person.doc, PutMode::Insert)
                .unwrap());
            self.names.push(person.guid);
        }
        db.commit_changes().unwrap()
    }

    /// Removes person 123, renames person 11 to "Eleven", and commits.
    pub fn update(&mut self) -> u64 {
        let mut db = self.open(OpenMode::Write);
        assert!(db.remove(self.names[123].as_bytes()).unwrap());
        self.names.remove(123);

        let eleven = db.get_mutable(self.names[11].as_bytes()).unwrap().unwrap();
        eleven.set("name", "Eleven");
        eleven.set("age", 12);
        eleven.set("about", "REDACTED");
        db.commit_changes().unwrap()
    }

    pub fn file_len(&self) -> u64 {
        std::fs::metadata(&self.path).unwrap().len()
    }
}

/// Name field of a document
pub fn name_of(db: &Database, key: &str) -> String {
    db.get_document(key.as_bytes())
        .unwrap()
        .and_then(|doc| doc["name"].as_str().map(str::to_string))
        .unwrap_or_default()
}

/// XORs the byte at `offset` (negative = from the end) with 0xFF
pub fn flip_byte(path: &Path, offset: i64) {
    let mut file = OpenOptions::new().read(true).write(true).open(path).unwrap();
    let pos = if offset < 0 {
        SeekFrom::End(offset)
    } else {
        SeekFrom::Start(offset as u64)
    };
    let at = file.seek(pos).unwrap();
    let mut byte = [0u8; 1];
    std::io::Read::read_exact(&mut file, &mut byte).unwrap();
    file.seek(SeekFrom::Start(at)).unwrap();
    file.write_all(&[byte[0] ^ 0xFF]).unwrap();
}

/// Appends raw bytes to the end of the file
pub fn append_bytes(path: &Path, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
}
