//! Row selection for bulk actions.

use std::collections::HashSet;
use std::hash::Hash;

/// Ids of the rows currently checked in a list.
///
/// Keeps the order in which rows were checked so bulk actions run in a
/// predictable order. Never persisted; cleared on tab switch and unmount.
#[derive(Debug, Clone)]
pub struct SelectionSet<Id> {
    order: Vec<Id>,
    ids: HashSet<Id>,
}

impl<Id> Default for SelectionSet<Id> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            ids: HashSet::new(),
        }
    }
}

impl<Id: Clone + Eq + Hash> SelectionSet<Id> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the row if unchecked, uncheck it otherwise. Returns whether the
    /// row is selected afterwards.
    pub fn toggle(&mut self, id: Id) -> bool {
        if self.ids.contains(&id) {
            self.deselect(&id);
            false
        } else {
            self.select(id);
            true
        }
    }

    pub fn select(&mut self, id: Id) {
        if self.ids.insert(id.clone()) {
            self.order.push(id);
        }
    }

    pub fn deselect(&mut self, id: &Id) -> bool {
        if self.ids.remove(id) {
            self.order.retain(|existing| existing != id);
            true
        } else {
            false
        }
    }

    /// Select every id in `ids`, e.g. all rows on the visible page.
    pub fn select_all<I: IntoIterator<Item = Id>>(&mut self, ids: I) {
        for id in ids {
            self.select(id);
        }
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.ids.clear();
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Selected ids in the order they were checked.
    pub fn ids(&self) -> &[Id] {
        &self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_selects_and_deselects() {
        let mut selection = SelectionSet::new();
        assert!(selection.toggle(7_i64));
        assert!(selection.contains(&7));
        assert_eq!(selection.len(), 1);

        assert!(!selection.toggle(7));
        assert!(!selection.contains(&7));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_select_is_idempotent_and_ordered() {
        let mut selection = SelectionSet::new();
        selection.select("b".to_string());
        selection.select("a".to_string());
        selection.select("b".to_string());
        assert_eq!(selection.ids(), ["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_select_all_then_clear() {
        let mut selection = SelectionSet::new();
        selection.select(2_i64);
        selection.select_all([1, 2, 3]);
        assert_eq!(selection.ids(), [2, 1, 3]);

        selection.clear();
        assert!(selection.is_empty());
        assert!(!selection.contains(&1));
    }

    #[test]
    fn test_deselect_missing_id() {
        let mut selection: SelectionSet<i64> = SelectionSet::new();
        assert!(!selection.deselect(&1));
    }
}
