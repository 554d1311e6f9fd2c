//! Data-access layer over the five remote todo operations.
//!
//! # Design
//! Reads go through a `QueryCache`: `list` is cached under `QueryKey::Todos`
//! and `get` under `QueryKey::Todo(id)`. Mutations are sent straight to the
//! transport and never write to or invalidate the cache; callers decide when
//! to resynchronize, so several mutations can share one refetch.

use std::sync::Arc;

use futures::FutureExt;
use todo_core::{ApiError, CreateTodo, Todo, TodoClient, TodoId, UpdateTodo};

use crate::cache::{QueryCache, QueryKey, QueryState};
use crate::config::ClientConfig;
use crate::transport::{ReqwestTransport, Transport};

pub struct TodoApi {
    client: TodoClient,
    transport: Arc<dyn Transport>,
    lists: QueryCache<Vec<Todo>>,
    items: QueryCache<Todo>,
}

impl TodoApi {
    pub fn new(client: TodoClient, transport: Arc<dyn Transport>) -> Self {
        Self {
            client,
            transport,
            lists: QueryCache::new(),
            items: QueryCache::new(),
        }
    }

    /// Build an API backed by `reqwest` from `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::new(TodoClient::new(&config.base_url), Arc::new(transport)))
    }

    /// All todos in server order.
    pub async fn list(&self) -> Result<Vec<Todo>, ApiError> {
        let client = self.client.clone();
        let transport = Arc::clone(&self.transport);
        self.lists
            .fetch(QueryKey::Todos, move || {
                async move {
                    let response = transport.execute(client.build_list_todos()).await?;
                    client.parse_list_todos(response)
                }
                .boxed()
            })
            .await
    }

    pub async fn get(&self, id: &TodoId) -> Result<Todo, ApiError> {
        let client = self.client.clone();
        let transport = Arc::clone(&self.transport);
        let request = client.build_get_todo(id);
        self.items
            .fetch(QueryKey::Todo(id.clone()), move || {
                async move {
                    let response = transport.execute(request).await?;
                    client.parse_get_todo(response)
                }
                .boxed()
            })
            .await
    }

    pub async fn create(&self, input: &CreateTodo) -> Result<Todo, ApiError> {
        let request = self.client.build_create_todo(input)?;
        let response = self.transport.execute(request).await?;
        let todo = self.client.parse_create_todo(response)?;
        tracing::info!(id = %todo.id, "created todo");
        Ok(todo)
    }

    pub async fn update(&self, id: &TodoId, patch: &UpdateTodo) -> Result<Todo, ApiError> {
        let request = self.client.build_update_todo(id, patch)?;
        let response = self.transport.execute(request).await?;
        let todo = self.client.parse_update_todo(response)?;
        tracing::info!(%id, completed = todo.completed, "updated todo");
        Ok(todo)
    }

    /// Deleting an id that does not exist fails with `ApiError::NotFound`.
    pub async fn delete(&self, id: &TodoId) -> Result<(), ApiError> {
        let response = self.transport.execute(self.client.build_delete_todo(id)).await?;
        self.client.parse_delete_todo(response)?;
        tracing::info!(%id, "deleted todo");
        Ok(())
    }

    pub fn invalidate(&self, key: &QueryKey) -> bool {
        match key {
            QueryKey::Todos => self.lists.invalidate(key),
            QueryKey::Todo(_) => self.items.invalidate(key),
        }
    }

    /// Drop the cached collection so the next `list` refetches.
    pub fn invalidate_todos(&self) -> bool {
        self.invalidate(&QueryKey::Todos)
    }

    pub fn list_state(&self) -> QueryState<Vec<Todo>> {
        self.lists.state(&QueryKey::Todos)
    }

    pub fn todo_state(&self, id: &TodoId) -> QueryState<Todo> {
        self.items.state(&QueryKey::Todo(id.clone()))
    }
}
