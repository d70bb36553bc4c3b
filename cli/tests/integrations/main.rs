mod check;
mod cycle;
mod formula;
mod score;

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const GAME: &str = r#"{
    "sessions": [{"id": "s1", "templateId": "t1", "playerIds": ["alice", "bob"]}],
    "templates": [{
        "id": "t1",
        "name": "Catan",
        "rules": [
            {"id": "tr1", "name": "Ten club",
             "condition": {"type": "total", "operator": ">=", "value": 10},
             "action": {"type": "add", "value": 5}}
        ]
    }],
    "categories": [
        {"id": "c1", "sessionId": "s1", "name": "Settlements"},
        {"id": "c2", "sessionId": "s1", "name": "Cities", "displayType": "weighted", "weight": 2}
    ],
    "entries": [
        {"id": "e1", "sessionId": "s1", "playerId": "bob", "value": 2, "categoryId": "c2",
         "createdAt": "2024-05-01T12:00:00Z"},
        {"id": "e2", "sessionId": "s1", "playerId": "alice", "value": 11, "categoryId": "c1",
         "createdAt": "2024-05-01T12:05:00Z"}
    ],
    "rules": [
        {"id": "r1", "sessionId": "s1", "name": "Ten club", "templateRuleId": "tr1",
         "condition": {"type": "total", "operator": ">=", "value": 10},
         "action": {"type": "add", "value": 5}}
    ]
}"#;

/// Write a state snapshot into a fresh temp dir
pub fn write_state(json: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("state.json");
    fs::write(&path, json).unwrap();
    (temp_dir, path)
}
