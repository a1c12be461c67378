//! Access rules for documents. Pure predicates; callers map a `false`
//! to the appropriate authorization failure.

use crate::model::{Actor, Document, UserId};

/// Query filter describing the set of documents an actor may list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListFilter {
    /// Admins see everything.
    All,
    /// Everyone else sees their own documents plus public ones.
    VisibleTo(UserId),
}

impl ListFilter {
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            ListFilter::All => true,
            ListFilter::VisibleTo(id) => doc.created_by == *id || doc.is_public,
        }
    }
}

pub fn list_filter(actor: &Actor) -> ListFilter {
    if actor.is_admin() {
        ListFilter::All
    } else {
        ListFilter::VisibleTo(actor.id.clone())
    }
}

pub fn can_read(actor: &Actor, doc: &Document) -> bool {
    actor.is_admin() || doc.created_by == actor.id || doc.is_public
}

/// Public visibility grants read only; writes stay with the owner.
pub fn can_write(actor: &Actor, doc: &Document) -> bool {
    actor.is_admin() || doc.created_by == actor.id
}

pub fn can_delete(actor: &Actor, doc: &Document) -> bool {
    can_write(actor, doc)
}
