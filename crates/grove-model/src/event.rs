//! Change notifications delivered to watch subscribers.

use serde::{Deserialize, Serialize};

use crate::path::NodePath;
use crate::session::SessionState;

/// A single watch notification.
///
/// Node events carry the path they fired for; session transitions are
/// broadcast to every subscriber so consumers can notice expiry without
/// polling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// The watched path came into existence.
    Created(NodePath),
    /// The watched node was deleted.
    Deleted(NodePath),
    /// The watched node's data changed.
    DataChanged(NodePath),
    /// The watched node's child list changed.
    ChildrenChanged(NodePath),
    /// The session moved to a new lifecycle state.
    SessionStateChanged(SessionState),
}

impl Event {
    /// The node path the event fired for, if it is a node event.
    pub fn path(&self) -> Option<&NodePath> {
        match self {
            Event::Created(path)
            | Event::Deleted(path)
            | Event::DataChanged(path)
            | Event::ChildrenChanged(path) => Some(path),
            Event::SessionStateChanged(_) => None,
        }
    }
}
