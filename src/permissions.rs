//! Operation kinds and the per-request permission allow-list supplied by upstream middleware.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::BitOr;

/// Wildcard entry in an allow-set: every shape is allowed.
pub const ALL_SHAPES: &str = "all";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Create,
        Operation::Read,
        Operation::Update,
        Operation::Delete,
        Operation::List,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::List => "list",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Operation::Create => 1,
            Operation::Read => 1 << 1,
            Operation::Update => 1 << 2,
            Operation::Delete => 1 << 3,
            Operation::List => 1 << 4,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of operations an endpoint serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Operations(u8);

impl Operations {
    pub const NONE: Operations = Operations(0);
    pub const ALL: Operations = Operations(0b1_1111);

    pub fn contains(self, op: Operation) -> bool {
        self.0 & op.bit() != 0
    }
}

impl Default for Operations {
    fn default() -> Self {
        Operations::ALL
    }
}

impl From<Operation> for Operations {
    fn from(op: Operation) -> Self {
        Operations(op.bit())
    }
}

impl BitOr for Operations {
    type Output = Operations;

    fn bitor(self, rhs: Operations) -> Operations {
        Operations(self.0 | rhs.0)
    }
}

impl BitOr<Operation> for Operations {
    type Output = Operations;

    fn bitor(self, rhs: Operation) -> Operations {
        Operations(self.0 | rhs.bit())
    }
}

impl BitOr for Operation {
    type Output = Operations;

    fn bitor(self, rhs: Operation) -> Operations {
        Operations(self.bit() | rhs.bit())
    }
}

impl FromIterator<Operation> for Operations {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        iter.into_iter().fold(Operations::NONE, |acc, op| acc | op)
    }
}

/// Per-operation allow-sets of shape names. Built per request by middleware and
/// handed to the dispatcher as an ordinary value.
///
/// An operation with no entry is allowed for every shape. An operation with an
/// entry is allowed only for the listed shapes, or for all when the set holds [`ALL_SHAPES`].
#[derive(Clone, Debug, Default)]
pub struct Permissions {
    allowed: HashMap<Operation, HashSet<String>>,
}

impl Permissions {
    pub fn new() -> Self {
        Permissions::default()
    }

    /// Restrict `op` to the given shape names (replacing any previous set).
    pub fn allow<I, S>(mut self, op: Operation, shapes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed
            .insert(op, shapes.into_iter().map(Into::into).collect());
        self
    }

    pub fn allowed_shapes(&self, op: Operation) -> Option<&HashSet<String>> {
        self.allowed.get(&op)
    }

    pub fn is_allowed(&self, op: Operation, shape: &str) -> bool {
        match self.allowed.get(&op) {
            None => true,
            Some(set) => set.contains(shape) || set.contains(ALL_SHAPES),
        }
    }
}
