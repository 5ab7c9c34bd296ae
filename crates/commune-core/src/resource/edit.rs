//! Staged, uncommitted edits keyed by item.

use std::collections::HashMap;

use crate::models::{FieldPatch, ItemId};

/// Edits staged per item. Nothing here reaches the server until committed,
/// and the base record is only changed by a confirmed commit.
#[derive(Debug, Default)]
pub(crate) struct EditBuffer {
    staged: HashMap<ItemId, FieldPatch>,
}

impl EditBuffer {
    pub(crate) fn stage(&mut self, id: ItemId, patch: FieldPatch) {
        self.staged.entry(id).or_default().merge(patch);
    }

    pub(crate) fn get(&self, id: &ItemId) -> Option<&FieldPatch> {
        self.staged.get(id)
    }

    pub(crate) fn discard(&mut self, id: &ItemId) -> Option<FieldPatch> {
        self.staged.remove(id)
    }

    pub(crate) fn clear(&mut self) {
        self.staged.clear();
    }
}
