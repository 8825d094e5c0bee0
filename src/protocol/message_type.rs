//! Message type registry
//!
//! Process-wide, append-only catalog binding a name to a stable 1-byte code.
//! `CHECK = 0`, `DATA = 1` and `ERROR = 2` are always present.
//!
//! Registration takes the registry's write lock, so concurrent first
//! registrations of distinct names never race on code assignment.
//! Lookups take the read lock only.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use parking_lot::RwLock;

use crate::error::{FrameError, Result};

/// A registered message type: a name plus its wire code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageType {
    code: u8,
    name: &'static str,
}

impl MessageType {
    /// Liveness probe, echoed back by the server
    pub const CHECK: MessageType = MessageType { code: 0, name: "CHECK" };

    /// Number + text sample payload
    pub const DATA: MessageType = MessageType { code: 1, name: "DATA" };

    /// Failure notification
    pub const ERROR: MessageType = MessageType { code: 2, name: "ERROR" };

    const PREDEFINED: [MessageType; 3] = [Self::CHECK, Self::DATA, Self::ERROR];

    /// Wire code
    pub fn code(&self) -> u8 {
        self.code
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Register `name`, or return the existing type if it is already known.
    ///
    /// New names get the lowest unused code at or above the last one handed out.
    pub fn register(name: &str) -> Result<MessageType> {
        validate_name(name)?;

        let mut registry = registry().write();
        if let Some(existing) = registry.by_name.get(name) {
            return Ok(*existing);
        }

        let code = registry.next_free_code().ok_or(FrameError::RegistryFull)?;
        let message_type = registry.bind(name, code);
        registry.next_code = code as usize + 1;
        tracing::debug!(name, code, "Registered message type");
        Ok(message_type)
    }

    /// Register `name` under an explicit code.
    ///
    /// Idempotent for the same (name, code) pair. Fails if the code is held
    /// by another name or the name is already bound to another code.
    pub fn register_with_code(name: &str, code: u8) -> Result<MessageType> {
        validate_name(name)?;

        let mut registry = registry().write();
        if let Some(existing) = registry.by_name.get(name) {
            if existing.code == code {
                return Ok(*existing);
            }
            return Err(FrameError::NameInUse {
                name: existing.name,
                code: existing.code,
            });
        }
        if let Some(holder) = registry.by_code[code as usize] {
            return Err(FrameError::CodeInUse {
                code,
                existing: holder.name,
            });
        }

        let message_type = registry.bind(name, code);
        tracing::debug!(name, code, "Registered message type with explicit code");
        Ok(message_type)
    }

    /// Look up a registered type by name
    pub fn by_name(name: &str) -> Option<MessageType> {
        registry().read().by_name.get(name).copied()
    }

    /// Look up a registered type by wire code
    pub fn by_code(code: u8) -> Option<MessageType> {
        registry().read().by_code[code as usize]
    }

    /// Snapshot of every registered type, ordered by code
    pub fn members() -> Vec<MessageType> {
        registry().read().by_code.iter().flatten().copied().collect()
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// =============================================================================
// Registry storage
// =============================================================================

struct Registry {
    by_name: HashMap<&'static str, MessageType>,
    by_code: [Option<MessageType>; 256],
    /// Codes below this have all been handed out
    next_code: usize,
}

impl Registry {
    fn with_predefined() -> Self {
        let mut registry = Self {
            by_name: HashMap::new(),
            by_code: [None; 256],
            next_code: 0,
        };
        for message_type in MessageType::PREDEFINED {
            registry.insert(message_type);
        }
        registry
    }

    fn next_free_code(&self) -> Option<u8> {
        (self.next_code..=u8::MAX as usize)
            .find(|&code| self.by_code[code].is_none())
            .map(|code| code as u8)
    }

    /// Bind a fresh name. Names live for the rest of the process.
    fn bind(&mut self, name: &str, code: u8) -> MessageType {
        let name: &'static str = Box::leak(name.to_owned().into_boxed_str());
        let message_type = MessageType { code, name };
        self.insert(message_type);
        message_type
    }

    fn insert(&mut self, message_type: MessageType) {
        let code = message_type.code as usize;
        self.by_name.insert(message_type.name, message_type);
        self.by_code[code] = Some(message_type);
        if code == self.next_code {
            self.next_code = code + 1;
        }
    }
}

fn registry() -> &'static RwLock<Registry> {
    static REGISTRY: OnceLock<RwLock<Registry>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(Registry::with_predefined()))
}

/// Names must look like identifiers: `[A-Za-z_][A-Za-z0-9_]*`
fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(FrameError::InvalidName(name.to_string()))
    }
}
