//! Drives the board: renders partitions from the cache and turns UI events
//! into remote mutations.
//!
//! # Design
//! The UI sends `UiEvent`s down an mpsc channel. `Board::run` owns the
//! receiving end. Drag gestures update the shared `DragSession`; every
//! resulting `BoardCommand` is planned by `todo_core::plan` and executed on
//! its own task, so a mutation keeps running whatever the UI does next.
//! After a successful state-changing effect the affected cache keys are
//! invalidated and the collection is refetched.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use todo_core::{partition, plan, BoardCommand, BoardError, DragSession, DropZone, Effect, Todo, TodoId};

use crate::api::TodoApi;
use crate::cache::QueryKey;
use crate::mutation::Mutation;

/// Input from the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    DragStart(Todo),
    DragCancel,
    DropOn(DropZone),
    Command(BoardCommand),
}

/// What one render pass needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardView {
    pub todos: Vec<Todo>,
    pub is_loading: bool,
    /// Display message of the list failure, if any.
    pub error: Option<String>,
    pub lifted: Option<TodoId>,
}

impl BoardView {
    pub fn incomplete(&self) -> Vec<&Todo> {
        partition(&self.todos).0
    }

    pub fn completed(&self) -> Vec<&Todo> {
        partition(&self.todos).1
    }

    pub fn is_lifted(&self, id: &TodoId) -> bool {
        self.lifted.as_ref() == Some(id)
    }
}

pub struct Board {
    api: Arc<TodoApi>,
    create: Mutation<Todo>,
    update: Mutation<Todo>,
    delete: Mutation<()>,
    drag: Mutex<DragSession>,
}

impl Board {
    pub fn new(api: Arc<TodoApi>) -> Self {
        Self {
            api,
            create: Mutation::new(),
            update: Mutation::new(),
            delete: Mutation::new(),
            drag: Mutex::new(DragSession::new()),
        }
    }

    pub fn api(&self) -> &TodoApi {
        &self.api
    }

    pub fn create_mutation(&self) -> &Mutation<Todo> {
        &self.create
    }

    pub fn update_mutation(&self) -> &Mutation<Todo> {
        &self.update
    }

    pub fn delete_mutation(&self) -> &Mutation<()> {
        &self.delete
    }

    fn drag(&self) -> MutexGuard<'_, DragSession> {
        self.drag.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Render from whatever the cache holds right now, without fetching.
    pub fn snapshot(&self) -> BoardView {
        let state = self.api.list_state();
        let error = state.error.as_ref().map(|err| err.message().to_string());
        BoardView {
            todos: state.data.unwrap_or_default(),
            is_loading: state.is_loading,
            error,
            lifted: self.drag().payload().map(|payload| payload.todo.id.clone()),
        }
    }

    /// Read the collection (from cache when possible) and render it.
    ///
    /// The todos come from the read itself, so a view stays populated even
    /// if the key was invalidated while the read was in flight.
    pub async fn view(&self) -> BoardView {
        let result = self.api.list().await;
        let mut view = self.snapshot();
        match result {
            Ok(todos) => {
                view.todos = todos;
                view.error = None;
            }
            Err(err) => {
                view.todos = Vec::new();
                view.error = Some(err.message().to_string());
            }
        }
        view
    }

    /// Apply a UI event. Drag gestures update the drag session; the
    /// returned command, if any, still has to be dispatched.
    pub fn handle_event(&self, event: &UiEvent) -> Option<BoardCommand> {
        let mut drag = self.drag();
        match event {
            UiEvent::DragStart(todo) => {
                drag.begin(todo.clone());
                None
            }
            UiEvent::DragCancel => {
                drag.cancel();
                None
            }
            UiEvent::DropOn(zone) => drag.drop_on(*zone),
            UiEvent::Command(command) => Some(command.clone()),
        }
    }

    /// Plan and execute one command, then resynchronize the collection.
    pub async fn dispatch(&self, command: BoardCommand) -> Result<Effect, BoardError> {
        let effect = plan(command)?;
        match &effect {
            Effect::Create(input) => {
                self.create.run(self.api.create(input)).await?;
            }
            Effect::Update { id, patch } => {
                self.update.run(self.api.update(id, patch)).await?;
            }
            Effect::Delete(id) => {
                self.delete.run(self.api.delete(id)).await?;
            }
            Effect::Nothing => {
                tracing::debug!("item dropped on its own zone");
            }
        }

        if effect.invalidates() {
            self.resync(&effect).await;
        }
        Ok(effect)
    }

    async fn resync(&self, effect: &Effect) {
        if let Effect::Update { id, .. } | Effect::Delete(id) = effect {
            self.api.invalidate(&QueryKey::Todo(id.clone()));
        }
        self.api.invalidate_todos();
        if let Err(err) = self.api.list().await {
            tracing::warn!(error = %err, "refetch after mutation failed");
        }
    }

    /// Consume events until every sender is dropped, then wait for the
    /// mutations already started.
    pub async fn run(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<UiEvent>) {
        let mut commands = Commands::new(self);
        while commands.step(&mut events).await {}
        commands.drain().await;
    }

    /// Start `run` on a task and hand back the sending side of its channel.
    pub fn spawn(self: &Arc<Self>) -> (mpsc::UnboundedSender<UiEvent>, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(Arc::clone(self).run(receiver));
        (sender, handle)
    }
}

/// Commands spawned by `Board::run`. Finished tasks are reaped as the loop
/// goes, so the set only holds mutations still in flight.
struct Commands {
    board: Arc<Board>,
    tasks: JoinSet<()>,
}

impl Commands {
    fn new(board: Arc<Board>) -> Self {
        Self {
            board,
            tasks: JoinSet::new(),
        }
    }

    fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Handle the next event or finished command. Returns `false` once the
    /// channel is closed.
    async fn step(&mut self, events: &mut mpsc::UnboundedReceiver<UiEvent>) -> bool {
        tokio::select! {
            biased;
            Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                reaped(joined);
                true
            }
            event = events.recv() => match event {
                Some(event) => {
                    self.submit(&event);
                    true
                }
                None => false,
            },
        }
    }

    fn submit(&mut self, event: &UiEvent) {
        let Some(command) = self.board.handle_event(event) else {
            return;
        };
        let board = Arc::clone(&self.board);
        self.tasks.spawn(async move {
            if let Err(err) = board.dispatch(command).await {
                tracing::warn!(error = %err, "board command failed");
            }
        });
    }

    async fn drain(&mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            reaped(joined);
        }
    }
}

fn reaped(joined: Result<(), JoinError>) {
    if let Err(err) = joined {
        tracing::error!(error = %err, "board command task did not finish");
    }
}
