//! Per-operation status for state-changing requests.
//!
//! # Design
//! Each UI control that mutates owns its own `Mutation`, so a failed create
//! never shows up on the list or on a delete button. Overlapping runs are
//! allowed; only the most recently started run may write the final status.
//! Nothing here retries or cancels.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use todo_core::ApiError;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MutationStatus<T> {
    #[default]
    Idle,
    Pending,
    Success(T),
    Error(ApiError),
}

#[derive(Debug)]
pub struct Mutation<T> {
    status: Mutex<MutationStatus<T>>,
    latest: AtomicU64,
}

impl<T> Default for Mutation<T> {
    fn default() -> Self {
        Self {
            status: Mutex::new(MutationStatus::Idle),
            latest: AtomicU64::new(0),
        }
    }
}

impl<T: Clone> Mutation<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MutationStatus<T>> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drive `request` to completion, recording pending, success and failure.
    pub async fn run<F>(&self, request: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let run = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        *self.lock() = MutationStatus::Pending;

        let result = request.await;

        if self.latest.load(Ordering::SeqCst) == run {
            *self.lock() = match &result {
                Ok(value) => MutationStatus::Success(value.clone()),
                Err(err) => MutationStatus::Error(err.clone()),
            };
        }
        result
    }

    pub fn status(&self) -> MutationStatus<T> {
        self.lock().clone()
    }

    pub fn is_loading(&self) -> bool {
        matches!(*self.lock(), MutationStatus::Pending)
    }

    pub fn data(&self) -> Option<T> {
        match &*self.lock() {
            MutationStatus::Success(value) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<ApiError> {
        match &*self.lock() {
            MutationStatus::Error(err) => Some(err.clone()),
            _ => None,
        }
    }

    /// Server-provided message of the last failure, or an empty string.
    pub fn error_message(&self) -> String {
        self.error().map(|err| err.message().to_string()).unwrap_or_default()
    }

    pub fn reset(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
        *self.lock() = MutationStatus::Idle;
    }
}
