// High-score persistence: a JSON array of `{ name, score }` entries kept in
// a single file, best score first.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// How many entries the table keeps.
pub const MAX_ENTRIES: usize = 10;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Highscore {
    pub name: String,
    pub score: f64,
}

pub struct HighscoreStore {
    path: PathBuf,
}

impl HighscoreStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        HighscoreStore { path: path.into() }
    }

    /// `~/.winkel_tass_highscores.json`, or the working directory when
    /// there is no home directory.
    pub fn default_path() -> PathBuf {
        let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        dir.join(".winkel_tass_highscores.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all entries. A missing file is an empty table.
    pub fn load(&self) -> Result<Vec<Highscore>> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read highscores from {:?}", self.path))
            }
        };
        serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse highscores in {:?}", self.path))
    }

    /// Insert `entry`, keep the best `MAX_ENTRIES` and write the table back.
    /// Returns the stored table.
    pub fn add(&self, entry: Highscore) -> Result<Vec<Highscore>> {
        let mut entries = self.load()?;
        entries.push(entry);
        // Stable sort: on a tie the older entry stays ahead.
        entries.sort_by(|a, b| b.score.total_cmp(&a.score));
        entries.truncate(MAX_ENTRIES);

        let json = serde_json::to_string_pretty(&entries).context("Serializing highscores")?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write highscores to {:?}", self.path))?;
        debug!(path = ?self.path, entries = entries.len(), "highscores saved");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(name: &str, score: f64) -> Highscore {
        Highscore {
            name: name.to_string(),
            score,
        }
    }

    #[test]
    fn missing_file_is_an_empty_table() {
        let dir = tempdir().unwrap();
        let store = HighscoreStore::new(dir.path().join("scores.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn entries_are_kept_best_first() {
        let dir = tempdir().unwrap();
        let store = HighscoreStore::new(dir.path().join("scores.json"));
        store.add(entry("ann", 120.5)).unwrap();
        store.add(entry("bob", 300.0)).unwrap();
        store.add(entry("cid", 120.5)).unwrap();

        let names: Vec<String> = store.load().unwrap().into_iter().map(|h| h.name).collect();
        assert_eq!(names, vec!["bob", "ann", "cid"]);
    }

    #[test]
    fn table_is_capped() {
        let dir = tempdir().unwrap();
        let store = HighscoreStore::new(dir.path().join("scores.json"));
        for i in 0..(MAX_ENTRIES + 3) {
            store.add(entry(&format!("p{}", i), i as f64)).unwrap();
        }
        let entries = store.load().unwrap();
        assert_eq!(entries.len(), MAX_ENTRIES);
        assert_eq!(entries[0].score, (MAX_ENTRIES + 2) as f64);
        assert_eq!(entries[MAX_ENTRIES - 1].score, 3.0);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scores.json");
        fs::write(&path, "{ not json").unwrap();
        let store = HighscoreStore::new(&path);
        assert!(store.load().is_err());
        assert!(store.add(entry("ann", 1.0)).is_err());
    }
}
