//! Projection of the cached collection into the two rendered lists.

use crate::types::Todo;

/// Split `todos` into `(incomplete, completed)`, preserving order.
///
/// Every todo lands in exactly one side, decided only by `completed`.
pub fn partition(todos: &[Todo]) -> (Vec<&Todo>, Vec<&Todo>) {
    todos.iter().partition(|todo| !todo.completed)
}
