//! Persistent document collection. Documents are stored individually on
//! disk as JSON and loaded at startup.

use crate::model::{Document, UserId};
use crate::policy::ListFilter;
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};
use uuid::Uuid;

pub struct DocumentStore {
    docs: HashMap<Uuid, Document>,
    dir: PathBuf,
}

impl DocumentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        // load existing
        let mut docs = HashMap::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::load(&path) {
                Ok(doc) => {
                    docs.insert(doc.id, doc);
                }
                Err(err) => {
                    tracing::warn!("skipping unreadable document {}: {err:#}", path.display());
                }
            }
        }
        Ok(Self { docs, dir })
    }

    fn load(path: &Path) -> Result<Document> {
        let data = std::fs::read(path)?;
        serde_json::from_slice(&data).context("malformed document file")
    }

    fn path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn save(&self, doc: &Document) -> Result<()> {
        let data = serde_json::to_vec(doc)?;
        std::fs::write(self.path(doc.id), data)?;
        Ok(())
    }

    /// Directory where documents are persisted.
    pub fn data_dir(&self) -> &Path {
        &self.dir
    }

    /// Iterate over all documents in the store.
    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.docs.values()
    }

    pub fn create(
        &mut self,
        title: String,
        content: String,
        summary: Option<String>,
        tags: Vec<String>,
        is_public: bool,
        created_by: UserId,
    ) -> Result<Document> {
        let now = Utc::now();
        let doc = Document {
            id: Uuid::new_v4(),
            title,
            content,
            summary,
            tags,
            is_public,
            created_by,
            created_at: now,
            updated_at: now,
        };
        self.save(&doc)?;
        self.docs.insert(doc.id, doc.clone());
        Ok(doc)
    }

    pub fn get(&self, id: Uuid) -> Option<&Document> {
        self.docs.get(&id)
    }

    /// Documents matching the given visibility filter, in arbitrary order.
    pub fn find(&self, filter: &ListFilter) -> Vec<&Document> {
        self.docs.values().filter(|d| filter.matches(d)).collect()
    }

    pub fn update(
        &mut self,
        id: Uuid,
        title: String,
        content: String,
        summary: Option<String>,
        is_public: bool,
    ) -> Result<Document> {
        let doc = self
            .docs
            .get_mut(&id)
            .ok_or_else(|| anyhow!("unknown document {id}"))?;
        doc.title = title;
        doc.content = content;
        doc.summary = summary;
        doc.is_public = is_public;
        doc.updated_at = Utc::now();
        let updated = doc.clone();
        self.save(&updated)?;
        Ok(updated)
    }

    pub fn delete(&mut self, id: Uuid) -> Result<()> {
        if self.docs.remove(&id).is_none() {
            return Err(anyhow!("unknown document {id}"));
        }
        std::fs::remove_file(self.path(id))?;
        Ok(())
    }
}
