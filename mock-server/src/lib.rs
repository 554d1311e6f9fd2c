use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: String,
    pub title: String,
    pub description: String,
    pub completed: bool,
}

#[derive(Deserialize)]
pub struct CreateTodo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Deserialize)]
pub struct UpdateTodo {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

/// `{ "data": ... }` wrapper returned by the read endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// `{ "message": ... }` body returned on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

struct Failure {
    status: StatusCode,
    message: &'static str,
}

impl Failure {
    fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "Todo not found",
        }
    }

    fn title_required() -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "title is required",
        }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            message: self.message.to_string(),
        };
        (self.status, Json(body)).into_response()
    }
}

/// Insertion-ordered store.
pub type Db = Arc<RwLock<Vec<Todo>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Vec::new()));
    Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/{id}", get(get_todo).patch(update_todo).delete(delete_todo))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn valid_title(title: &str) -> bool {
    !title.trim().is_empty()
}

async fn list_todos(State(db): State<Db>) -> Json<Envelope<Vec<Todo>>> {
    let todos = db.read().await;
    tracing::debug!(count = todos.len(), "list todos");
    Json(Envelope { data: todos.clone() })
}

async fn create_todo(
    State(db): State<Db>,
    Json(input): Json<CreateTodo>,
) -> Result<(StatusCode, Json<Todo>), Failure> {
    let title = input.title.filter(|t| valid_title(t)).ok_or_else(Failure::title_required)?;
    let todo = Todo {
        id: Uuid::new_v4().to_string(),
        title,
        description: input.description,
        completed: false,
    };
    tracing::info!(id = %todo.id, "created todo");
    db.write().await.push(todo.clone());
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn get_todo(State(db): State<Db>, Path(id): Path<String>) -> Result<Json<Envelope<Todo>>, Failure> {
    let todos = db.read().await;
    todos
        .iter()
        .find(|t| t.id == id)
        .cloned()
        .map(|data| Json(Envelope { data }))
        .ok_or_else(Failure::not_found)
}

async fn update_todo(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<UpdateTodo>,
) -> Result<Json<Todo>, Failure> {
    if input.title.as_deref().is_some_and(|t| !valid_title(t)) {
        return Err(Failure::title_required());
    }
    let mut todos = db.write().await;
    let todo = todos.iter_mut().find(|t| t.id == id).ok_or_else(Failure::not_found)?;
    if let Some(title) = input.title {
        todo.title = title;
    }
    if let Some(description) = input.description {
        todo.description = description;
    }
    if let Some(completed) = input.completed {
        todo.completed = completed;
    }
    tracing::info!(%id, completed = todo.completed, "updated todo");
    Ok(Json(todo.clone()))
}

async fn delete_todo(State(db): State<Db>, Path(id): Path<String>) -> Result<StatusCode, Failure> {
    let mut todos = db.write().await;
    let index = todos.iter().position(|t| t.id == id).ok_or_else(Failure::not_found)?;
    todos.remove(index);
    tracing::info!(%id, "deleted todo");
    Ok(StatusCode::NO_CONTENT)
}
