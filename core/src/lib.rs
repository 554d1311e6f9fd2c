//! Synchronous API client core and board logic for the todo service.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). The caller executes the
//! actual HTTP round-trip, making the core fully deterministic and testable.
//! The board state machine lives here too, so every drag, drop and form
//! submission can be planned without a renderer.
//!
//! # Design
//! - `TodoClient` is stateless; it holds only `base_url`.
//! - Each CRUD operation is split into `build_*` (produces request) and
//!   `parse_*` (consumes response), so the I/O boundary is explicit.
//! - `board::plan` maps a UI command to exactly one remote `Effect`.
//! - `view::partition` is the only way the two rendered lists are derived.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod board;
pub mod client;
pub mod error;
pub mod http;
pub mod types;
pub mod view;

pub use board::{
    plan, Action, BoardCommand, BoardError, DragPayload, DragSession, DropZone, Effect, Position,
    TodoForm,
};
pub use client::TodoClient;
pub use error::{ApiError, ErrorKind};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use types::{CreateTodo, Todo, TodoId, UpdateTodo};
pub use view::partition;
