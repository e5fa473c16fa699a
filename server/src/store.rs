//! Mutating operations on one session's lists.
//!
//! [`ListStore`] borrows the list sequence out of a session for the duration
//! of a single request. Lists are addressed by their position in the
//! sequence; every position is bounds-checked and an out-of-range position
//! fails with [`TodoError::InvalidIndex`] without touching the data.
//!
//! # Example
//!
//! ```rust
//! use listkeeper_server::store::ListStore;
//!
//! let mut lists = Vec::new();
//! let mut store = ListStore::new(&mut lists);
//!
//! let id = store.create_list("Groceries").unwrap();
//! let index = store.position_of(id).unwrap();
//! store.add_todo(index, "milk").unwrap();
//! store.set_todo_completed(index, 0, true).unwrap();
//!
//! assert!(lists[0].todos[0].completed);
//! ```

use tracing::debug;

use crate::error::{Target, TodoError};
use crate::types::{Todo, TodoList};
use crate::validation::{next_list_id, validate_list_name, validate_todo_name};

/// Mutable view over a session's list sequence.
#[derive(Debug)]
pub struct ListStore<'a> {
    lists: &'a mut Vec<TodoList>,
}

impl<'a> ListStore<'a> {
    pub fn new(lists: &'a mut Vec<TodoList>) -> Self {
        Self { lists }
    }

    /// All lists in insertion order.
    pub fn lists(&self) -> &[TodoList] {
        self.lists.as_slice()
    }

    /// Resolves a list id to its current position.
    pub fn position_of(&self, id: u64) -> Result<usize, TodoError> {
        self.lists
            .iter()
            .position(|list| list.id == id)
            .ok_or_else(|| TodoError::invalid_index(Target::List, id))
    }

    /// The list at `index`.
    pub fn list(&self, index: usize) -> Result<&TodoList, TodoError> {
        self.lists
            .get(index)
            .ok_or_else(|| TodoError::invalid_index(Target::List, index))
    }

    fn list_mut(&mut self, index: usize) -> Result<&mut TodoList, TodoError> {
        self.lists
            .get_mut(index)
            .ok_or_else(|| TodoError::invalid_index(Target::List, index))
    }

    fn todo_mut(&mut self, index: usize, todo_index: usize) -> Result<&mut Todo, TodoError> {
        self.list_mut(index)?
            .todos
            .get_mut(todo_index)
            .ok_or_else(|| TodoError::invalid_index(Target::Todo, todo_index))
    }

    /// Appends a new, empty list and returns its id.
    pub fn create_list(&mut self, name: &str) -> Result<u64, TodoError> {
        validate_list_name(name, self.lists.as_slice())?;

        let id = next_list_id(self.lists.as_slice());
        self.lists.push(TodoList::new(id, name));
        debug!(list_id = id, list_count = self.lists.len(), "Created list");

        Ok(id)
    }

    /// Renames the list at `index`.
    ///
    /// The new name must differ from every list's current name, including
    /// the list's own.
    pub fn rename_list(&mut self, index: usize, name: &str) -> Result<(), TodoError> {
        // Bounds first so a stale index reports "not found", not a name error.
        self.list(index)?;
        validate_list_name(name, self.lists.as_slice())?;

        let list = self.list_mut(index)?;
        list.name = name.to_string();
        debug!(list_id = list.id, "Renamed list");

        Ok(())
    }

    /// Removes the list at `index`, returning it.
    pub fn delete_list(&mut self, index: usize) -> Result<TodoList, TodoError> {
        self.list(index)?;

        let removed = self.lists.remove(index);
        debug!(
            list_id = removed.id,
            remaining = self.lists.len(),
            "Deleted list"
        );

        Ok(removed)
    }

    /// Appends a new, incomplete todo to the list at `index`.
    pub fn add_todo(&mut self, index: usize, name: &str) -> Result<(), TodoError> {
        let list = self.list_mut(index)?;
        validate_todo_name(name)?;

        list.todos.push(Todo::new(name));
        debug!(list_id = list.id, todo_count = list.todos.len(), "Added todo");

        Ok(())
    }

    /// Removes the todo at `todo_index` from the list at `index`, returning it.
    pub fn delete_todo(&mut self, index: usize, todo_index: usize) -> Result<Todo, TodoError> {
        let list = self.list_mut(index)?;
        if todo_index >= list.todos.len() {
            return Err(TodoError::invalid_index(Target::Todo, todo_index));
        }

        let removed = list.todos.remove(todo_index);
        debug!(list_id = list.id, todo_index, "Deleted todo");

        Ok(removed)
    }

    /// Sets the completed flag of one todo.
    pub fn set_todo_completed(
        &mut self,
        index: usize,
        todo_index: usize,
        completed: bool,
    ) -> Result<(), TodoError> {
        self.todo_mut(index, todo_index)?.completed = completed;
        debug!(list_index = index, todo_index, completed, "Updated todo");

        Ok(())
    }

    /// Marks every todo in the list at `index` completed.
    pub fn complete_all(&mut self, index: usize) -> Result<(), TodoError> {
        let list = self.list_mut(index)?;
        for todo in &mut list.todos {
            todo.completed = true;
        }
        debug!(list_id = list.id, todo_count = list.todos.len(), "Completed all todos");

        Ok(())
    }
}
