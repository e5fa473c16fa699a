//! Name validation and list id assignment.
//!
//! All functions here are pure; they inspect the session's lists but never
//! change them.

use crate::error::{Target, TodoError};
use crate::types::TodoList;

/// Shortest accepted name, in characters.
pub const MIN_NAME_LENGTH: usize = 1;

/// Longest accepted name, in characters.
pub const MAX_NAME_LENGTH: usize = 100;

fn has_valid_length(name: &str) -> bool {
    (MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&name.chars().count())
}

/// Checks a proposed list name against the length rule and the names of
/// every existing list.
///
/// A list being renamed is not excluded, so resubmitting its current name is
/// reported as a duplicate.
///
/// # Example
///
/// ```rust
/// use listkeeper_server::error::TodoError;
/// use listkeeper_server::types::TodoList;
/// use listkeeper_server::validation::validate_list_name;
///
/// let lists = vec![TodoList::new(0, "Groceries")];
/// assert_eq!(
///     validate_list_name("Groceries", &lists),
///     Err(TodoError::DuplicateName)
/// );
/// assert!(validate_list_name("Chores", &lists).is_ok());
/// ```
pub fn validate_list_name(name: &str, existing: &[TodoList]) -> Result<(), TodoError> {
    if !has_valid_length(name) {
        return Err(TodoError::invalid_length(Target::List));
    }

    if existing.iter().any(|list| list.name == name) {
        return Err(TodoError::DuplicateName);
    }

    Ok(())
}

/// Checks a proposed todo name against the length rule.
pub fn validate_todo_name(name: &str) -> Result<(), TodoError> {
    if !has_valid_length(name) {
        return Err(TodoError::invalid_length(Target::Todo));
    }

    Ok(())
}

/// Returns the id for the next list: one past the highest id in use, or 0
/// when there are no lists.
pub fn next_list_id(lists: &[TodoList]) -> u64 {
    lists.iter().map(|list| list.id).max().map_or(0, |max| max + 1)
}
