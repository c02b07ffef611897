//! Selection state for bulk actions.
//!
//! [`Selection`] owns the ordered set of selected image names and notifies
//! registered `on_change` listeners whenever the set changes. The bulk
//! "analyze selected" flow turns it into units of work with
//! [`Selection::to_units`].

use crate::job::UnitOfWork;

type ChangeFn<'a> = Box<dyn FnMut(&[String]) + 'a>;

/// Ordered, de-duplicated set of selected image names.
#[derive(Default)]
pub struct Selection<'a> {
    items: Vec<String>,
    on_change: Vec<ChangeFn<'a>>,
}

impl<'a> Selection<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener called with the full selection after each change.
    pub fn on_change(&mut self, f: impl FnMut(&[String]) + 'a) {
        self.on_change.push(Box::new(f));
    }

    /// Adds `name`. Returns false if it was already selected.
    pub fn select(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.items.push(name);
        self.notify();
        true
    }

    /// Removes `name`. Returns false if it was not selected.
    pub fn deselect(&mut self, name: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item != name);
        let removed = self.items.len() != before;
        if removed {
            self.notify();
        }
        removed
    }

    /// Flips `name` and returns whether it is now selected.
    pub fn toggle(&mut self, name: &str) -> bool {
        if self.deselect(name) {
            false
        } else {
            self.select(name)
        }
    }

    /// Adds every new name, notifying once. Returns how many were added.
    pub fn select_all<I, S>(&mut self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = 0;
        for name in names {
            let name = name.into();
            if !self.contains(&name) {
                self.items.push(name);
                added += 1;
            }
        }
        if added > 0 {
            self.notify();
        }
        added
    }

    pub fn clear(&mut self) {
        if !self.items.is_empty() {
            self.items.clear();
            self.notify();
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.iter().any(|item| item == name)
    }

    pub fn selected(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// One `Analyze` unit per selected image, in selection order.
    pub fn to_units(&self, folder: Option<&str>) -> Vec<UnitOfWork> {
        self.items
            .iter()
            .map(|name| UnitOfWork::analyze(name.clone(), folder.map(str::to_string)))
            .collect()
    }

    fn notify(&mut self) {
        for listener in &mut self.on_change {
            listener(&self.items);
        }
    }
}
