//! Per-cell intents produced during rule evaluation.
//!
//! An [`Intent`] exists only between rule evaluation and application
//! within a single tick. It is never persisted.

use serde::{Deserialize, Serialize};

use crate::structs::Position;

/// The decision a single occupied cell makes for the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    /// Grow one tick older and stay put.
    Age,
    /// Spawn offspring into an empty neighbor.
    Reproduce {
        /// Where the offspring appears.
        target: Position,
    },
    /// Step into an empty neighbor.
    Move {
        /// Destination cell.
        target: Position,
    },
    /// Consume a prey neighbor and take its place.
    Eat {
        /// Cell holding the prey.
        target: Position,
    },
    /// The occupant dies and the cell becomes empty.
    Die,
}

impl Intent {
    /// The destination cell this intent claims, if any.
    pub const fn target(&self) -> Option<Position> {
        match self {
            Self::Reproduce { target } | Self::Move { target } | Self::Eat { target } => {
                Some(*target)
            }
            Self::Age | Self::Die => None,
        }
    }
}
