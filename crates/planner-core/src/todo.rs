use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoItem {
    pub id: Uuid,
    pub text: String,
    #[serde(default)]
    pub done: bool,
}

impl TodoItem {
    pub fn new_pending(text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            done: false,
        }
    }
}

/// Ordered to-do items. Positions handed out to users are 1-based and follow
/// insertion order.
#[derive(Debug, Clone, Default)]
pub struct TodoList {
    items: Vec<TodoItem>,
}

impl TodoList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[TodoItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.items.iter().filter(|item| !item.done).count()
    }

    #[tracing::instrument(skip(self, text))]
    pub fn add(&mut self, text: &str) -> Option<&TodoItem> {
        let text = text.trim();
        if text.is_empty() {
            debug!("ignoring blank to-do");
            return None;
        }

        let item = TodoItem::new_pending(text.to_string());
        info!(id = %item.id, "to-do added");
        self.items.push(item);
        self.items.last()
    }

    #[tracing::instrument(skip(self))]
    pub fn toggle(&mut self, position: usize) -> anyhow::Result<&TodoItem> {
        let idx = self.index_of(position)?;
        let item = &mut self.items[idx];
        item.done = !item.done;
        debug!(id = %item.id, done = item.done, "to-do toggled");
        Ok(&*item)
    }

    #[tracing::instrument(skip(self))]
    pub fn remove(&mut self, position: usize) -> anyhow::Result<TodoItem> {
        let idx = self.index_of(position)?;
        let item = self.items.remove(idx);
        info!(id = %item.id, "to-do removed");
        Ok(item)
    }

    fn index_of(&self, position: usize) -> anyhow::Result<usize> {
        if position == 0 || position > self.items.len() {
            return Err(anyhow!(
                "no to-do at position {position} (list has {})",
                self.items.len()
            ));
        }
        Ok(position - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::TodoList;

    #[test]
    fn add_toggle_remove_keep_identity() {
        let mut list = TodoList::new();
        let first = list.add("Buy milk").expect("added").id;
        let second = list.add("Email Sam").expect("added").id;
        assert_eq!(list.len(), 2);
        assert_ne!(first, second);

        let toggled = list.toggle(2).expect("toggle");
        assert_eq!(toggled.id, second);
        assert!(toggled.done);
        assert_eq!(list.remaining(), 1);

        let removed = list.remove(1).expect("remove");
        assert_eq!(removed.id, first);
        assert_eq!(list.items()[0].id, second);
        assert!(list.items()[0].done);
        assert!(list.items().iter().all(|item| item.id != first));
    }

    #[test]
    fn blank_text_is_ignored() {
        let mut list = TodoList::new();
        assert!(list.add("   ").is_none());
        assert!(list.is_empty());
    }

    #[test]
    fn positions_are_one_based_and_checked() {
        let mut list = TodoList::new();
        list.add("only");
        assert!(list.toggle(0).is_err());
        assert!(list.remove(2).is_err());
        assert_eq!(list.len(), 1);
    }
}
