//! Read-only helpers that turn session data into display order and view data.
//!
//! Lists and todos are shown incomplete-first. The partition is stable and
//! every item keeps its original position, which forms and links use to refer
//! back to it.

use serde::Serialize;

use crate::types::{Todo, TodoList};

/// CSS class applied to finished lists.
pub const COMPLETE_CLASS: &str = "complete";

/// A list is complete when it has at least one todo and all are completed.
pub fn is_list_complete(list: &TodoList) -> bool {
    !list.todos.is_empty() && list.todos.iter().all(|todo| todo.completed)
}

/// Number of completed todos in `list`.
pub fn completed_count(list: &TodoList) -> usize {
    list.todos.iter().filter(|todo| todo.completed).count()
}

/// Number of todos in `list` still to do.
pub fn remaining_count(list: &TodoList) -> usize {
    list.todos.len() - completed_count(list)
}

/// CSS class for a list row, if any.
pub fn list_class(list: &TodoList) -> Option<&'static str> {
    is_list_complete(list).then_some(COMPLETE_CLASS)
}

/// Stable partition of `items` into (not done, done), each paired with its
/// original index, concatenated in that order.
fn partition_by<T>(items: &[T], done: impl Fn(&T) -> bool) -> Vec<(&T, usize)> {
    let (finished, mut ordered): (Vec<_>, Vec<_>) = items
        .iter()
        .enumerate()
        .map(|(index, item)| (item, index))
        .partition(|(item, _)| done(*item));

    ordered.extend(finished);
    ordered
}

/// Incomplete lists, then complete lists, each in original order.
pub fn sort_lists(lists: &[TodoList]) -> Vec<(&TodoList, usize)> {
    partition_by(lists, is_list_complete)
}

/// Incomplete todos, then completed todos, each in original order.
pub fn sort_todos(todos: &[Todo]) -> Vec<(&Todo, usize)> {
    partition_by(todos, |todo| todo.completed)
}

/// One row of the list index page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListSummary {
    pub id: u64,
    pub name: String,
    pub class: String,
    pub completed: usize,
    pub total: usize,
    pub remaining: usize,
}

impl ListSummary {
    pub fn from_list(list: &TodoList) -> Self {
        Self {
            id: list.id,
            name: list.name.clone(),
            class: list_class(list).unwrap_or_default().to_string(),
            completed: completed_count(list),
            total: list.todos.len(),
            remaining: remaining_count(list),
        }
    }
}

/// One todo row; `index` is its position within the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TodoView {
    pub index: usize,
    pub name: String,
    pub completed: bool,
}

/// Everything the single-list page shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListDetail {
    pub id: u64,
    pub name: String,
    pub class: String,
    pub complete: bool,
    pub completed: usize,
    pub total: usize,
    pub todos: Vec<TodoView>,
}

impl ListDetail {
    pub fn from_list(list: &TodoList) -> Self {
        let todos = sort_todos(&list.todos)
            .into_iter()
            .map(|(todo, index)| TodoView {
                index,
                name: todo.name.clone(),
                completed: todo.completed,
            })
            .collect();

        Self {
            id: list.id,
            name: list.name.clone(),
            class: list_class(list).unwrap_or_default().to_string(),
            complete: is_list_complete(list),
            completed: completed_count(list),
            total: list.todos.len(),
            todos,
        }
    }
}

/// Index page rows in display order.
pub fn list_summaries(lists: &[TodoList]) -> Vec<ListSummary> {
    sort_lists(lists)
        .into_iter()
        .map(|(list, _)| ListSummary::from_list(list))
        .collect()
}
