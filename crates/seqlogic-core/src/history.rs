//! Versioned id-to-value collection with staged edits and undo/redo.
//!
//! Edits are applied to the live map immediately and recorded in a staging
//! buffer. [`History::commit`] seals the buffer into one operation of a
//! linear log; [`History::undo`] and [`History::redo`] move a cursor over
//! that log. Committing after an undo discards the redo tail.

use indexmap::IndexMap;

/// Before/after values of one id within an operation.
///
/// `None` means the id was absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Modification<T> {
    /// Value before the operation
    pub deleted: Option<T>,
    /// Value after the operation
    pub inserted: Option<T>,
}

/// A committed batch of modifications, keyed by id.
pub type Operation<T> = IndexMap<String, Modification<T>>;

/// A map with a replayable edit log.
#[derive(Debug, Clone)]
pub struct History<T> {
    items: IndexMap<String, T>,
    operations: Vec<Operation<T>>,
    /// Index of the first operation to redo
    head: usize,
    staged: Operation<T>,
}

impl<T> Default for History<T>
where
    T: Clone,
{
    fn default() -> Self {
        Self::new(IndexMap::new())
    }
}

impl<T> History<T>
where
    T: Clone,
{
    /// Wrap an initial set of items. The log starts empty.
    #[must_use]
    pub fn new(items: IndexMap<String, T>) -> Self {
        Self {
            items,
            operations: Vec::new(),
            head: 0,
            staged: IndexMap::new(),
        }
    }

    /// Check if an id exists.
    #[must_use]
    pub fn has(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Owned copy of the current value.
    ///
    /// Changes to the copy are only kept once passed back to [`History::set`].
    #[must_use]
    pub fn get(&self, id: &str) -> Option<T> {
        self.items.get(id).cloned()
    }

    /// Borrow the current value.
    #[must_use]
    pub fn peek(&self, id: &str) -> Option<&T> {
        self.items.get(id)
    }

    /// Iterate over all entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &T)> {
        self.items.iter()
    }

    /// Iterate over all ids.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.items.keys()
    }

    /// Iterate over all values.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }

    /// Get the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Copy of the live map.
    #[must_use]
    pub fn to_map(&self) -> IndexMap<String, T> {
        self.items.clone()
    }

    /// Stage an insert or replacement.
    pub fn set(&mut self, id: &str, value: T) {
        let origin = self.items.get(id).cloned();
        self.staged
            .entry(id.to_string())
            .and_modify(|m| m.inserted = Some(value.clone()))
            .or_insert_with(|| Modification {
                deleted: origin,
                inserted: Some(value.clone()),
            });
        self.items.insert(id.to_string(), value);
    }

    /// Stage a removal. Does nothing if `id` is absent.
    pub fn delete(&mut self, id: &str) {
        let Some(origin) = self.items.shift_remove(id) else {
            return;
        };
        self.staged
            .entry(id.to_string())
            .and_modify(|m| m.inserted = None)
            .or_insert(Modification {
                deleted: Some(origin),
                inserted: None,
            });
    }

    /// Seal the staged edits into one operation.
    ///
    /// Any operations after the cursor are discarded first.
    pub fn commit(&mut self) {
        self.operations.truncate(self.head);
        self.operations.push(std::mem::take(&mut self.staged));
        self.head += 1;
    }

    /// Revert the live map to its state before the staged edits.
    pub fn clear_uncommitted(&mut self) {
        let staged = std::mem::take(&mut self.staged);
        // newest edits first, so ids re-inserted here keep their order
        for (id, modification) in staged.into_iter().rev() {
            Self::apply(&mut self.items, id, modification.deleted);
        }
    }

    /// Check if there are staged edits.
    #[must_use]
    pub fn has_uncommitted(&self) -> bool {
        !self.staged.is_empty()
    }

    /// Check if an operation can be undone.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.head > 0
    }

    /// Check if an operation can be redone.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.head < self.operations.len()
    }

    /// Number of operations currently applied.
    #[must_use]
    pub fn head(&self) -> usize {
        self.head
    }

    /// Number of operations in the log, including undone ones.
    #[must_use]
    pub fn log_len(&self) -> usize {
        self.operations.len()
    }

    /// Revert the last applied operation.
    ///
    /// Returns `Ok(false)` when there is nothing to undo.
    ///
    /// # Errors
    ///
    /// Returns error if there are staged edits.
    pub fn undo(&mut self) -> Result<bool, HistoryError> {
        if self.has_uncommitted() {
            return Err(HistoryError::Uncommitted { action: "undo" });
        }
        if !self.can_undo() {
            return Ok(false);
        }
        self.head -= 1;
        for (id, modification) in &self.operations[self.head] {
            Self::apply(&mut self.items, id.clone(), modification.deleted.clone());
        }
        Ok(true)
    }

    /// Re-apply the next undone operation.
    ///
    /// Returns `Ok(false)` when there is nothing to redo.
    ///
    /// # Errors
    ///
    /// Returns error if there are staged edits.
    pub fn redo(&mut self) -> Result<bool, HistoryError> {
        if self.has_uncommitted() {
            return Err(HistoryError::Uncommitted { action: "redo" });
        }
        if !self.can_redo() {
            return Ok(false);
        }
        for (id, modification) in &self.operations[self.head] {
            Self::apply(&mut self.items, id.clone(), modification.inserted.clone());
        }
        self.head += 1;
        Ok(true)
    }

    fn apply(items: &mut IndexMap<String, T>, id: String, value: Option<T>) {
        match value {
            Some(value) => {
                items.insert(id, value);
            }
            None => {
                items.shift_remove(&id);
            }
        }
    }
}

/// Errors that can occur with history operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    /// Undo or redo attempted while edits are staged
    #[error("cannot {action} while modifying")]
    Uncommitted {
        /// The rejected action
        action: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(entries: &[(&str, i32)]) -> History<i32> {
        History::new(
            entries
                .iter()
                .map(|(id, value)| ((*id).to_string(), *value))
                .collect(),
        )
    }

    #[test]
    fn get_returns_owned_copy() {
        let h = history(&[("a", 1)]);
        let mut copy = h.get("a").unwrap();
        copy += 1;
        assert_eq!(copy, 2);
        assert_eq!(h.get("a"), Some(1));
        assert_eq!(h.get("missing"), None);
    }

    #[test]
    fn set_applies_immediately_and_stages() {
        let mut h = history(&[]);
        h.set("a", 1);
        assert_eq!(h.get("a"), Some(1));
        assert!(h.has_uncommitted());
        h.commit();
        assert!(!h.has_uncommitted());
        assert_eq!(h.head(), 1);
    }

    #[test]
    fn undo_restores_pre_commit_values() {
        let mut h = history(&[("a", 1), ("b", 2)]);
        h.set("a", 10);
        h.set("a", 11);
        h.delete("b");
        h.set("c", 3);
        h.commit();

        assert_eq!(h.undo(), Ok(true));
        assert_eq!(h.to_map(), history(&[("a", 1), ("b", 2)]).to_map());

        assert_eq!(h.redo(), Ok(true));
        assert_eq!(h.get("a"), Some(11));
        assert_eq!(h.get("b"), None);
        assert_eq!(h.get("c"), Some(3));
    }

    #[test]
    fn insert_then_delete_in_one_session() {
        let mut h = history(&[]);
        h.set("a", 1);
        h.delete("a");
        h.commit();

        assert!(!h.has("a"));
        assert_eq!(h.undo(), Ok(true));
        assert!(!h.has("a"));
        assert_eq!(h.redo(), Ok(true));
        assert!(!h.has("a"));
    }

    #[test]
    fn delete_missing_is_noop() {
        let mut h = history(&[("a", 1)]);
        h.delete("missing");
        assert!(!h.has_uncommitted());
    }

    #[test]
    fn undo_redo_bounds() {
        let mut h = history(&[]);
        assert_eq!(h.undo(), Ok(false));
        assert_eq!(h.redo(), Ok(false));

        h.set("a", 1);
        h.commit();
        assert_eq!(h.redo(), Ok(false));
        assert_eq!(h.undo(), Ok(true));
        assert_eq!(h.undo(), Ok(false));
    }

    #[test]
    fn undo_while_staged_fails() {
        let mut h = history(&[]);
        h.set("a", 1);
        assert_eq!(
            h.undo(),
            Err(HistoryError::Uncommitted { action: "undo" })
        );
        assert_eq!(
            h.redo(),
            Err(HistoryError::Uncommitted { action: "redo" })
        );
        assert_eq!(h.get("a"), Some(1));
    }

    #[test]
    fn commit_after_undo_discards_redo_tail() {
        let mut h = history(&[]);
        h.set("a", 1);
        h.commit();
        h.set("b", 2);
        h.commit();

        assert_eq!(h.undo(), Ok(true));
        h.set("c", 3);
        h.commit();

        assert_eq!(h.log_len(), 2);
        assert!(!h.can_redo());
        assert!(h.has("a"));
        assert!(!h.has("b"));
        assert!(h.has("c"));
    }

    #[test]
    fn clear_uncommitted_reverts_live_map() {
        let mut h = history(&[("a", 1), ("b", 2)]);
        h.set("a", 5);
        h.delete("b");
        h.set("c", 3);

        h.clear_uncommitted();

        assert!(!h.has_uncommitted());
        assert_eq!(h.get("a"), Some(1));
        assert_eq!(h.get("b"), Some(2));
        assert!(!h.has("c"));
        assert_eq!(h.log_len(), 0);
    }
}
