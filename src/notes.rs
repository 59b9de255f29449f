//! Notes library
//!
//! Append-only from the pipeline's perspective; the library view can also
//! list and delete. Every capture flow ends with exactly one `add` call.
//! The library is persisted as a JSON file in the data dir; persistence
//! failures are logged and never block note creation.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const LIBRARY_FILE_NAME: &str = "notes.json";

/// Whether the note body came from a successful generation or a fallback
/// template. Kept on the note so consumers can tell degraded outcomes apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteQuality {
    Full,
    Degraded,
}

/// Provenance attached by some capture flows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub origin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_points: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
}

/// The final study-note artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedNote {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub quality: NoteQuality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_metadata: Option<SourceMetadata>,
}

/// Application-wide collection of generated notes.
pub struct NotesStore {
    notes: Vec<GeneratedNote>,
    path: Option<PathBuf>,
}

impl NotesStore {
    /// Store without persistence (tests, one-shot flows).
    pub fn in_memory() -> Self {
        Self {
            notes: Vec::new(),
            path: None,
        }
    }

    /// Store backed by a JSON file; existing entries are loaded, a missing
    /// or unreadable file starts an empty library.
    pub fn open(path: PathBuf) -> Self {
        let notes = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Vec<GeneratedNote>>(&contents) {
                Ok(notes) => notes,
                Err(e) => {
                    tracing::warn!("Notes library: failed to parse {:?}: {}", path, e);
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                tracing::warn!("Notes library: failed to read {:?}: {}", path, e);
                Vec::new()
            }
        };

        Self {
            notes,
            path: Some(path),
        }
    }

    /// Default on-disk location: ~/.local/share/feynman-notes/notes.json
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("feynman-notes")
            .join(LIBRARY_FILE_NAME)
    }

    /// Append a note, assigning id and timestamp, and persist the library.
    pub fn add(
        &mut self,
        title: impl Into<String>,
        body: impl Into<String>,
        quality: NoteQuality,
        source_metadata: Option<SourceMetadata>,
    ) -> GeneratedNote {
        let note = GeneratedNote {
            id: Uuid::new_v4(),
            title: title.into(),
            body: body.into(),
            created_at: Utc::now(),
            quality,
            source_metadata,
        };

        self.notes.push(note.clone());
        self.persist();
        note
    }

    pub fn list(&self) -> &[GeneratedNote] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Delete a note by id. Returns whether anything was removed.
    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.notes.len();
        self.notes.retain(|n| n.id != id);
        let removed = self.notes.len() != before;
        if removed {
            self.persist();
        }
        removed
    }

    /// Write the library to disk atomically (temp file, then rename).
    /// Failures are logged; the in-memory library stays authoritative.
    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };

        let result = (|| -> Result<(), String> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("create dir {:?}: {}", parent, e))?;
            }

            let contents = serde_json::to_string_pretty(&self.notes)
                .map_err(|e| format!("serialize library: {}", e))?;

            let tmp_path = path.with_extension("json.tmp");
            std::fs::write(&tmp_path, &contents)
                .map_err(|e| format!("write temp {:?}: {}", tmp_path, e))?;

            if cfg!(windows) && path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        return Err(format!("remove existing {:?}: {}", path, e));
                    }
                }
            }

            std::fs::rename(&tmp_path, path)
                .map_err(|e| format!("rename {:?} to {:?}: {}", tmp_path, path, e))
        })();

        if let Err(e) = result {
            tracing::warn!("Notes library: persist failed ({}), keeping in memory", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_assigns_unique_ids_and_timestamps() {
        let mut store = NotesStore::in_memory();
        let a = store.add("A", "body a", NoteQuality::Full, None);
        let b = store.add("B", "body b", NoteQuality::Degraded, None);

        assert_ne!(a.id, b.id);
        assert_eq!(store.len(), 2);
        assert_eq!(store.list()[0].title, "A");
        assert_eq!(store.list()[1].quality, NoteQuality::Degraded);
    }

    #[test]
    fn remove_deletes_by_id() {
        let mut store = NotesStore::in_memory();
        let note = store.add("A", "body", NoteQuality::Full, None);

        assert!(store.remove(note.id));
        assert!(!store.remove(note.id));
        assert!(store.is_empty());
    }

    #[test]
    fn library_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");

        let saved_id = {
            let mut store = NotesStore::open(path.clone());
            let note = store.add(
                "Photosynthesis",
                "MAIN TOPIC:\nPhotosynthesis",
                NoteQuality::Full,
                Some(SourceMetadata {
                    origin: "upload".to_string(),
                    ..Default::default()
                }),
            );
            note.id
        };

        let store = NotesStore::open(path);
        assert_eq!(store.len(), 1);
        assert_eq!(store.list()[0].id, saved_id);
        assert_eq!(store.list()[0].title, "Photosynthesis");
        assert_eq!(
            store.list()[0].source_metadata.as_ref().unwrap().origin,
            "upload"
        );
    }

    #[test]
    fn corrupt_library_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = NotesStore::open(path);
        assert!(store.is_empty());
    }
}
