//! Async data-access layer and board driver for the todo service.
//!
//! # Overview
//! `todo-core` builds and parses requests and plans board transitions
//! without I/O. This crate supplies the I/O: a `Transport`, a coalescing
//! `QueryCache` behind `TodoApi`, per-operation `Mutation` status, and a
//! `Board` that consumes UI events from a channel.
//!
//! # Design
//! - The cache is a constructed dependency owned by `TodoApi`; there is no
//!   global state.
//! - Mutations never write to the cache. The board invalidates and
//!   refetches after each successful state change, delete included.

pub mod api;
pub mod board;
pub mod cache;
pub mod config;
pub mod mutation;
pub mod transport;

pub use api::TodoApi;
pub use board::{Board, BoardView, UiEvent};
pub use cache::{QueryCache, QueryKey, QueryState};
pub use config::{ClientConfig, ConfigError};
pub use mutation::{Mutation, MutationStatus};
pub use transport::{ReqwestTransport, Transport, TransportFuture};
