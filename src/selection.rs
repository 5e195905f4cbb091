use crate::record::RecordId;
use std::collections::BTreeSet;

/// Rows the user has selected, keyed by record identity.
///
/// Selection is stored by [`RecordId`] so that it keeps its meaning when the
/// view is refiltered or resorted. Ids are mapped back to on-screen positions
/// only when rendering or exporting.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<RecordId>,
}

impl Selection {
    pub fn new() -> Self {
        Selection::default()
    }

    /// Add the id if absent, remove it if present. Returns whether the id is
    /// selected afterwards.
    pub fn toggle(&mut self, id: RecordId) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    pub fn insert(&mut self, id: RecordId) -> bool {
        self.ids.insert(id)
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.ids.contains(&id)
    }

    /// Make the selection exactly the rows of the current view. Rows hidden
    /// by the filter are deselected.
    pub fn select_all(&mut self, view: &[RecordId]) {
        self.ids = view.iter().copied().collect();
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn is_all_selected(&self, view: &[RecordId]) -> bool {
        !view.is_empty() && view.iter().all(|id| self.ids.contains(id))
    }

    /// The select-all checkbox: clears when the whole view is already
    /// selected, otherwise selects the whole view.
    pub fn toggle_all(&mut self, view: &[RecordId]) {
        if self.is_all_selected(view) {
            self.clear();
        } else {
            self.select_all(view);
        }
    }

    /// Positions of selected rows within `view`, ascending.
    pub fn positions(&self, view: &[RecordId]) -> Vec<usize> {
        view.iter()
            .enumerate()
            .filter(|(_, id)| self.ids.contains(id))
            .map(|(pos, _)| pos)
            .collect()
    }

    /// Selected ids in current view order. Selected rows hidden by the
    /// current filter are left out but stay selected.
    pub fn resolve(&self, view: &[RecordId]) -> Vec<RecordId> {
        view.iter().copied().filter(|id| self.ids.contains(id)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.ids.iter().copied()
    }
}
