//! Board interaction state machine.
//!
//! # Design
//! A todo sits in one of two positions, decided solely by its `completed`
//! flag. UI gestures (button clicks, drag and drop, form submits) become
//! `BoardCommand` values; `plan` turns a command into the single remote
//! `Effect` it requires, or rejects it. Nothing here performs I/O, so every
//! transition is testable without a renderer or a server.
//!
//! Transitions:
//! - `Incomplete -> Completed`: the complete action, or a drop on the
//!   completed zone.
//! - `Completed -> Incomplete`: only a drop on the incomplete zone.
//! - either -> removed: the delete action.
//! - `Incomplete` -> edited: the edit form.

use std::fmt;

use thiserror::Error;

use crate::error::ApiError;
use crate::types::{CreateTodo, Todo, TodoId, UpdateTodo};

/// Which partition a todo belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    Incomplete,
    Completed,
}

impl Position {
    pub fn of(todo: &Todo) -> Self {
        if todo.completed {
            Position::Completed
        } else {
            Position::Incomplete
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Position::Incomplete => "incomplete",
            Position::Completed => "completed",
        })
    }
}

/// One of the two drop targets. Each accepts only `DragPayload`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropZone {
    Incomplete,
    Completed,
}

impl DropZone {
    /// Position an item lands in when dropped here.
    pub fn position(self) -> Position {
        match self {
            DropZone::Incomplete => Position::Incomplete,
            DropZone::Completed => Position::Completed,
        }
    }
}

/// Explicit per-item actions that are only offered in some positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Complete,
    Edit,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Complete => "complete",
            Action::Edit => "edit",
        })
    }
}

/// What a dragged item carries to a drop zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragPayload {
    pub todo: Todo,
}

impl DragPayload {
    pub fn origin(&self) -> Position {
        Position::of(&self.todo)
    }
}

/// Tracks the item currently being dragged, if any.
#[derive(Debug, Clone, Default)]
pub struct DragSession {
    lifted: Option<DragPayload>,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lift `todo`. A previous unfinished drag is discarded.
    pub fn begin(&mut self, todo: Todo) -> &DragPayload {
        self.lifted.insert(DragPayload { todo })
    }

    /// Whether the item should render in its lifted state.
    pub fn is_lifted(&self, id: &TodoId) -> bool {
        self.lifted.as_ref().is_some_and(|p| &p.todo.id == id)
    }

    pub fn payload(&self) -> Option<&DragPayload> {
        self.lifted.as_ref()
    }

    /// Gesture ended outside any zone.
    pub fn cancel(&mut self) -> Option<DragPayload> {
        self.lifted.take()
    }

    /// Gesture ended over `zone`. Returns `None` when nothing was lifted.
    pub fn drop_on(&mut self, zone: DropZone) -> Option<BoardCommand> {
        self.lifted
            .take()
            .map(|payload| BoardCommand::Drop { payload, zone })
    }
}

/// A state-transition request raised by the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardCommand {
    Create { title: String, description: String },
    Complete { todo: Todo },
    Drop { payload: DragPayload, zone: DropZone },
    Edit { todo: Todo, title: String, description: String },
    Delete { id: TodoId },
}

/// The remote operation a command resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Create(CreateTodo),
    Update { id: TodoId, patch: UpdateTodo },
    Delete(TodoId),
    Nothing,
}

impl Effect {
    /// Whether the cached collection must be refetched once the effect succeeds.
    pub fn invalidates(&self) -> bool {
        !matches!(self, Effect::Nothing)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("cannot {action} a {position} todo")]
    Unavailable { action: Action, position: Position },

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl BoardError {
    /// Text shown next to the control that raised the command.
    pub fn message(&self) -> String {
        match self {
            BoardError::Api(err) => err.message().to_string(),
            other => other.to_string(),
        }
    }
}

/// Resolve a command to its effect.
///
/// Dropping an item on the zone it already occupies resolves to
/// `Effect::Nothing` instead of a redundant update.
pub fn plan(command: BoardCommand) -> Result<Effect, BoardError> {
    match command {
        BoardCommand::Create { title, description } => Ok(Effect::Create(CreateTodo { title, description })),
        BoardCommand::Complete { todo } => {
            require(&todo, Position::Incomplete, Action::Complete)?;
            Ok(Effect::Update {
                id: todo.id,
                patch: UpdateTodo::completed(true),
            })
        }
        BoardCommand::Drop { payload, zone } => {
            let target = zone.position();
            if payload.origin() == target {
                return Ok(Effect::Nothing);
            }
            Ok(Effect::Update {
                id: payload.todo.id,
                patch: UpdateTodo::completed(target == Position::Completed),
            })
        }
        BoardCommand::Edit {
            todo,
            title,
            description,
        } => {
            require(&todo, Position::Incomplete, Action::Edit)?;
            Ok(Effect::Update {
                id: todo.id,
                patch: UpdateTodo::details(title, description),
            })
        }
        BoardCommand::Delete { id } => Ok(Effect::Delete(id)),
    }
}

fn require(todo: &Todo, expected: Position, action: Action) -> Result<(), BoardError> {
    let position = Position::of(todo);
    if position == expected {
        Ok(())
    } else {
        Err(BoardError::Unavailable { action, position })
    }
}

/// Whether the form adds a new todo or edits an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FormMode {
    Create,
    Edit(Todo),
}

/// Add/edit form state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoForm {
    mode: FormMode,
    pub title: String,
    pub description: String,
}

impl TodoForm {
    pub fn create() -> Self {
        Self {
            mode: FormMode::Create,
            title: String::new(),
            description: String::new(),
        }
    }

    /// Open the form pre-populated from `todo`. Completed todos are not editable.
    pub fn edit(todo: &Todo) -> Result<Self, BoardError> {
        require(todo, Position::Incomplete, Action::Edit)?;
        Ok(Self {
            mode: FormMode::Edit(todo.clone()),
            title: todo.title.clone(),
            description: todo.description.clone(),
        })
    }

    pub fn is_edit(&self) -> bool {
        matches!(self.mode, FormMode::Edit(_))
    }

    pub fn submit(self) -> BoardCommand {
        match self.mode {
            FormMode::Create => BoardCommand::Create {
                title: self.title,
                description: self.description,
            },
            FormMode::Edit(todo) => BoardCommand::Edit {
                todo,
                title: self.title,
                description: self.description,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn todo(id: &str, completed: bool) -> Todo {
        Todo {
            id: TodoId::new(id),
            title: format!("title {id}"),
            description: format!("description {id}"),
            completed,
        }
    }

    #[test]
    fn complete_action_marks_completed() {
        let effect = plan(BoardCommand::Complete { todo: todo("1", false) }).unwrap();
        assert_eq!(
            effect,
            Effect::Update {
                id: TodoId::new("1"),
                patch: UpdateTodo::completed(true)
            }
        );
        assert!(effect.invalidates());
    }

    #[test]
    fn complete_action_unavailable_on_completed_item() {
        let err = plan(BoardCommand::Complete { todo: todo("1", true) }).unwrap_err();
        assert_eq!(
            err,
            BoardError::Unavailable {
                action: Action::Complete,
                position: Position::Completed
            }
        );
        assert_eq!(err.message(), "cannot complete a completed todo");
    }

    #[test]
    fn drop_on_completed_zone_completes() {
        let mut session = DragSession::new();
        session.begin(todo("1", false));
        let command = session.drop_on(DropZone::Completed).unwrap();
        assert_eq!(
            plan(command).unwrap(),
            Effect::Update {
                id: TodoId::new("1"),
                patch: UpdateTodo::completed(true)
            }
        );
    }

    #[test]
    fn drop_on_incomplete_zone_reopens() {
        let mut session = DragSession::new();
        session.begin(todo("1", true));
        let command = session.drop_on(DropZone::Incomplete).unwrap();
        assert_eq!(
            plan(command).unwrap(),
            Effect::Update {
                id: TodoId::new("1"),
                patch: UpdateTodo::completed(false)
            }
        );
    }

    #[test]
    fn drop_on_own_zone_is_nothing() {
        let payload = DragPayload { todo: todo("1", true) };
        let effect = plan(BoardCommand::Drop {
            payload,
            zone: DropZone::Completed,
        })
        .unwrap();
        assert_eq!(effect, Effect::Nothing);
        assert!(!effect.invalidates());

        let payload = DragPayload { todo: todo("2", false) };
        let effect = plan(BoardCommand::Drop {
            payload,
            zone: DropZone::Incomplete,
        })
        .unwrap();
        assert_eq!(effect, Effect::Nothing);
    }

    #[test]
    fn drag_session_lifts_one_item() {
        let mut session = DragSession::new();
        assert!(session.drop_on(DropZone::Completed).is_none());

        session.begin(todo("1", false));
        assert!(session.is_lifted(&TodoId::new("1")));
        assert!(!session.is_lifted(&TodoId::new("2")));

        session.begin(todo("2", false));
        assert!(!session.is_lifted(&TodoId::new("1")));
        assert!(session.is_lifted(&TodoId::new("2")));

        let cancelled = session.cancel().unwrap();
        assert_eq!(cancelled.todo.id, TodoId::new("2"));
        assert!(session.payload().is_none());
    }

    #[test]
    fn drop_ends_the_drag() {
        let mut session = DragSession::new();
        session.begin(todo("1", false));
        assert!(session.drop_on(DropZone::Completed).is_some());
        assert!(!session.is_lifted(&TodoId::new("1")));
        assert!(session.drop_on(DropZone::Completed).is_none());
    }

    #[test]
    fn delete_is_available_in_both_positions() {
        for completed in [false, true] {
            let item = todo("9", completed);
            let effect = plan(BoardCommand::Delete { id: item.id }).unwrap();
            assert_eq!(effect, Effect::Delete(TodoId::new("9")));
            assert!(effect.invalidates());
        }
    }

    #[test]
    fn edit_form_prepopulates_and_patches_details_only() {
        let item = todo("3", false);
        let mut form = TodoForm::edit(&item).unwrap();
        assert!(form.is_edit());
        assert_eq!(form.title, "title 3");
        assert_eq!(form.description, "description 3");

        form.title = "Renamed".to_string();
        let effect = plan(form.submit()).unwrap();
        assert_eq!(
            effect,
            Effect::Update {
                id: TodoId::new("3"),
                patch: UpdateTodo::details("Renamed", "description 3")
            }
        );
        if let Effect::Update { patch, .. } = effect {
            assert!(patch.completed.is_none());
        }
    }

    #[test]
    fn edit_form_refuses_completed_item() {
        let err = TodoForm::edit(&todo("3", true)).unwrap_err();
        assert!(matches!(
            err,
            BoardError::Unavailable {
                action: Action::Edit,
                ..
            }
        ));
    }

    #[test]
    fn edit_command_for_completed_item_is_rejected() {
        let err = plan(BoardCommand::Edit {
            todo: todo("3", true),
            title: "x".to_string(),
            description: String::new(),
        })
        .unwrap_err();
        assert!(matches!(err, BoardError::Unavailable { .. }));
    }

    #[test]
    fn create_form_submits_create() {
        let mut form = TodoForm::create();
        assert!(!form.is_edit());
        form.title = "A".to_string();
        form.description = "B".to_string();
        assert_eq!(plan(form.submit()).unwrap(), Effect::Create(CreateTodo::new("A", "B")));
    }

    #[test]
    fn api_errors_surface_server_message() {
        let err = BoardError::from(ApiError::NotFound {
            message: "Todo not found".to_string(),
        });
        assert_eq!(err.message(), "Todo not found");
    }
}
