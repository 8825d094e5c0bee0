//! Handler registry
//!
//! Maps a message type to the function that turns its payload into a result.
//! Dispatch is the single point where handler failures are isolated: an
//! `Err` or a panic from a handler becomes [`Dispatch::Unhandled`] and never
//! reaches the connection's read loop.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::HandlerError;
use crate::protocol::{preview, MessageType};

/// Result type for handler functions.
pub type HandlerResult<T> = std::result::Result<T, HandlerError>;

/// Shared handler function.
pub type HandlerFn<T> = Arc<dyn Fn(&[u8]) -> HandlerResult<T> + Send + Sync>;

/// Outcome of dispatching one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch<T> {
    /// The handler produced a result
    Handled(T),

    /// No handler, or the handler failed
    Unhandled { reason: String },
}

impl<T> Dispatch<T> {
    pub fn is_handled(&self) -> bool {
        matches!(self, Dispatch::Handled(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Dispatch::Handled(value) => Some(value),
            Dispatch::Unhandled { .. } => None,
        }
    }
}

/// Registry mapping message types to handlers.
///
/// Later registrations for the same type replace earlier ones.
pub struct HandlerRegistry<T> {
    /// Owner label for log events ("server" / "client")
    role: &'static str,
    handlers: RwLock<HashMap<MessageType, HandlerFn<T>>>,
}

impl<T> HandlerRegistry<T> {
    /// Create a new empty registry.
    pub fn new(role: &'static str) -> Self {
        Self {
            role,
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a handler, replacing any existing one for `message_type`.
    pub fn register<F>(&self, message_type: MessageType, handler: F)
    where
        F: Fn(&[u8]) -> HandlerResult<T> + Send + Sync + 'static,
    {
        let replaced = self
            .handlers
            .write()
            .insert(message_type, Arc::new(handler))
            .is_some();

        tracing::debug!(
            role = self.role,
            %message_type,
            replaced,
            "Registered handler"
        );
    }

    /// Check if a handler exists for `message_type`.
    pub fn contains(&self, message_type: MessageType) -> bool {
        self.handlers.read().contains_key(&message_type)
    }

    /// Get the number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    /// Types with a registered handler, ordered by code.
    pub fn registered_types(&self) -> Vec<MessageType> {
        let mut types: Vec<_> = self.handlers.read().keys().copied().collect();
        types.sort();
        types
    }

    /// Route a payload to its handler and normalize the outcome.
    pub fn dispatch(&self, message_type: MessageType, payload: &[u8]) -> Dispatch<T> {
        // Clone out so the lock is not held while the handler runs
        let handler = self.handlers.read().get(&message_type).cloned();

        let Some(handler) = handler else {
            tracing::warn!(role = self.role, %message_type, "No handler for message type");
            return Dispatch::Unhandled {
                reason: format!("no handler for {}", message_type),
            };
        };

        match panic::catch_unwind(AssertUnwindSafe(|| handler(payload))) {
            Ok(Ok(value)) => Dispatch::Handled(value),
            Ok(Err(e)) => {
                tracing::error!(
                    role = self.role,
                    %message_type,
                    payload = %preview(payload),
                    error = %e,
                    "Error in handler"
                );
                Dispatch::Unhandled {
                    reason: format!("{} handler failed: {}", message_type, e),
                }
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(
                    role = self.role,
                    %message_type,
                    payload = %preview(payload),
                    panic = %message,
                    "Handler panicked"
                );
                Dispatch::Unhandled {
                    reason: format!("{} handler failed: {}", message_type, message),
                }
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
