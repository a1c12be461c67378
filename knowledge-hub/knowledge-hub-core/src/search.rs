use crate::model::Document;
use crate::store::DocumentStore;
use anyhow::Result;
use std::path::Path;
use tantivy::{
    collector::TopDocs,
    directory::MmapDirectory,
    doc,
    schema::{Schema, STORED, STRING, TEXT},
    Index, ReloadPolicy, Term,
};
use uuid::Uuid;

/// Full-text index over document title, content, and tags.
pub struct SearchIndex {
    index: Index,
    id: tantivy::schema::Field,
    title: tantivy::schema::Field,
    content: tantivy::schema::Field,
    tags: tantivy::schema::Field,
}

impl SearchIndex {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let mut schema_builder = Schema::builder();
        let id = schema_builder.add_text_field("id", STRING | STORED);
        let title = schema_builder.add_text_field("title", TEXT);
        let content = schema_builder.add_text_field("content", TEXT);
        let tags = schema_builder.add_text_field("tags", TEXT);
        let schema = schema_builder.build();
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        let dir = MmapDirectory::open(path)?;
        let index = Index::open_or_create(dir, schema)?;
        Ok(Self {
            index,
            id,
            title,
            content,
            tags,
        })
    }

    pub fn index_document(&self, document: &Document) -> Result<()> {
        let mut writer = self.index.writer(50_000_000)?;
        // reindexing an existing document replaces its previous entry
        writer.delete_term(Term::from_field_text(self.id, &document.id.to_string()));
        writer.add_document(doc!(
            self.id => document.id.to_string(),
            self.title => document.title.as_str(),
            self.content => document.content.as_str(),
            self.tags => document.tags.join(" "),
        ))?;
        writer.commit()?;
        writer.wait_merging_threads()?;
        Ok(())
    }

    pub fn remove_document(&self, id: Uuid) -> Result<()> {
        let mut writer = self.index.writer(50_000_000)?;
        writer.delete_term(Term::from_field_text(self.id, &id.to_string()));
        writer.commit()?;
        writer.wait_merging_threads()?;
        Ok(())
    }

    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<Uuid>> {
        let reader = self
            .index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommit)
            .try_into()?;
        let searcher = reader.searcher();
        let parser = tantivy::query::QueryParser::for_index(
            &self.index,
            vec![self.title, self.content, self.tags],
        );
        let q = parser.parse_query(query)?;
        let docs = searcher.search(&q, &TopDocs::with_limit(limit))?;
        Ok(docs
            .into_iter()
            .filter_map(|(_score, addr)| {
                let retrieved = searcher.doc(addr).ok()?;
                let field = retrieved.get_first(self.id)?;
                field.as_text().and_then(|s| Uuid::parse_str(s).ok())
            })
            .collect())
    }

    /// Rebuild the index from the full store contents at startup.
    pub fn index_all(&self, store: &DocumentStore) -> Result<()> {
        for doc in store.iter() {
            self.index_document(doc)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UserId;
    use chrono::Utc;

    fn doc(title: &str, content: &str, tags: &[&str]) -> Document {
        Document {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: content.to_string(),
            summary: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            is_public: false,
            created_by: UserId::from("alice"),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn finds_documents_by_title_content_and_tags() {
        let dir = tempfile::tempdir().unwrap();
        let index = SearchIndex::new(dir.path()).unwrap();
        let by_title = doc("quarterly roadmap", "plans", &[]);
        let by_content = doc("notes", "the onboarding checklist", &[]);
        let by_tag = doc("misc", "nothing", &["infrastructure"]);
        for d in [&by_title, &by_content, &by_tag] {
            index.index_document(d).unwrap();
        }

        assert_eq!(index.search("roadmap", 10).unwrap(), vec![by_title.id]);
        assert_eq!(index.search("onboarding", 10).unwrap(), vec![by_content.id]);
        assert_eq!(
            index.search("infrastructure", 10).unwrap(),
            vec![by_tag.id]
        );
    }

    #[test]
    fn reindex_replaces_previous_entry() {
        let dir = tempfile::tempdir().unwrap();
        let index = SearchIndex::new(dir.path()).unwrap();
        let mut d = doc("first title", "body", &[]);
        index.index_document(&d).unwrap();
        d.title = "second title".to_string();
        index.index_document(&d).unwrap();

        assert!(index.search("first", 10).unwrap().is_empty());
        assert_eq!(index.search("second", 10).unwrap(), vec![d.id]);
    }

    #[test]
    fn removed_documents_stop_matching() {
        let dir = tempfile::tempdir().unwrap();
        let index = SearchIndex::new(dir.path()).unwrap();
        let d = doc("ephemeral", "body", &[]);
        index.index_document(&d).unwrap();
        index.remove_document(d.id).unwrap();
        assert!(index.search("ephemeral", 10).unwrap().is_empty());
    }
}
