//! Ordered collection of loaded files keyed by id.

use crate::error::AppError;
use crate::ingest::LoadedFile;

/// Files registered for a merge, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct FileRegistry {
    entries: Vec<(String, LoadedFile)>,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|(existing, _)| existing == id)
    }

    pub fn get(&self, id: &str) -> Option<&LoadedFile> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, file)| file)
    }

    /// The id `file_{n+1}` that the next unnamed file receives, skipping
    /// any id a caller already claimed.
    pub fn next_id(&self) -> String {
        let mut n = self.entries.len() + 1;
        loop {
            let id = format!("file_{}", n);
            if !self.contains(&id) {
                return id;
            }
            n += 1;
        }
    }

    /// Registers `file` under `id`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidParameter` if `id` is empty or already taken.
    pub fn insert(&mut self, id: String, file: LoadedFile) -> Result<(), AppError> {
        if id.trim().is_empty() {
            return Err(AppError::InvalidParameter("File id cannot be empty".into()));
        }
        if self.contains(&id) {
            return Err(AppError::InvalidParameter(format!(
                "File id '{}' is already registered",
                id
            )));
        }
        self.entries.push((id, file));
        Ok(())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn files(&self) -> impl Iterator<Item = &LoadedFile> + '_ {
        self.entries.iter().map(|(_, file)| file)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LoadedFile)> + '_ {
        self.entries.iter().map(|(id, file)| (id.as_str(), file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{load_bytes, LoadOptions};

    fn file(name: &str) -> LoadedFile {
        load_bytes(name, b"id,v\n1,2\n", &LoadOptions::default())
            .expect("Fixture should load")
    }

    #[test]
    fn test_insert_keeps_order_and_rejects_duplicates() {
        let mut registry = FileRegistry::new();
        registry.insert("b".into(), file("b.csv")).unwrap();
        registry.insert("a".into(), file("a.csv")).unwrap();
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["b", "a"]);

        let err = registry.insert("a".into(), file("c.csv")).unwrap_err();
        assert!(matches!(err, AppError::InvalidParameter(_)));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("a").map(LoadedFile::name), Some("a.csv"));
    }

    #[test]
    fn test_next_id_skips_claimed_ids() {
        let mut registry = FileRegistry::new();
        assert_eq!(registry.next_id(), "file_1");
        registry.insert("file_2".into(), file("x.csv")).unwrap();
        assert_eq!(registry.next_id(), "file_3");
        registry.insert("file_3".into(), file("y.csv")).unwrap();
        assert_eq!(registry.next_id(), "file_4");
    }

    #[test]
    fn test_empty_id_rejected() {
        let mut registry = FileRegistry::new();
        assert!(registry.insert("  ".into(), file("x.csv")).is_err());
    }
}
