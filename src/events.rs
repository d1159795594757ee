//! Domain events that invalidate cached data, and the scope each maps to.

use serde::{Deserialize, Serialize};

use crate::coherence::InvalidationScope;
use crate::constants::namespaces::{OBJECTS, PATHS, ROLES, ROOM_FIND, ROOM_INTEL, STRUCTURES};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case", rename_all_fields = "camelCase")]
/// Something happened in the world that makes cached data stale.
pub enum CacheEvent {
    /// A creep ceased to exist.
    CreepDied { creep_name: String },
    /// A game object ceased to exist.
    ObjectRemoved { id: String },
    /// A structure was destroyed.
    StructureDestroyed {
        room_name: String,
        structure_type: Option<String>,
    },
    /// A structure finished building.
    StructureBuilt {
        room_name: String,
        structure_type: Option<String>,
    },
    /// A room became hostile.
    RoomHostile { room_name: String },
    /// Visibility or ownership of a room was lost.
    RoomLost { room_name: String },
    /// Host state was reset; nothing cached can be trusted.
    Reset,
}

impl CacheEvent {
    /// Namespaces this kind of event invalidates. Empty means all of them.
    pub fn target_namespaces(&self) -> &'static [&'static str] {
        match self {
            CacheEvent::CreepDied { .. } => &[ROLES, PATHS],
            CacheEvent::ObjectRemoved { .. } => &[OBJECTS],
            CacheEvent::StructureDestroyed { .. } | CacheEvent::StructureBuilt { .. } => {
                &[STRUCTURES, ROOM_FIND, PATHS]
            }
            CacheEvent::RoomHostile { .. } => &[ROOM_INTEL, PATHS],
            CacheEvent::RoomLost { .. } => &[ROOM_FIND, STRUCTURES, ROOM_INTEL, PATHS],
            CacheEvent::Reset => &[],
        }
    }

    pub fn to_scope(&self) -> InvalidationScope {
        let scope = match self {
            CacheEvent::CreepDied { creep_name } => InvalidationScope::creep(creep_name.as_str()),
            CacheEvent::ObjectRemoved { id } => InvalidationScope::object(id.as_str()),
            CacheEvent::StructureDestroyed {
                room_name,
                structure_type,
            }
            | CacheEvent::StructureBuilt {
                room_name,
                structure_type,
            } => InvalidationScope::structure(room_name.as_str(), structure_type.as_deref()),
            CacheEvent::RoomHostile { room_name } | CacheEvent::RoomLost { room_name } => {
                InvalidationScope::room(room_name.as_str())
            }
            CacheEvent::Reset => InvalidationScope::global(),
        };

        let namespaces = self.target_namespaces();
        if namespaces.is_empty() {
            scope
        } else {
            scope.in_namespaces(namespaces.iter().copied())
        }
    }
}

impl From<&CacheEvent> for InvalidationScope {
    fn from(event: &CacheEvent) -> Self {
        event.to_scope()
    }
}
