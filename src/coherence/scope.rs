//! Invalidation scopes and their translation into key patterns.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
/// What to invalidate, before namespace targeting.
pub enum ScopeKind {
    /// Every entry.
    Global,
    /// Keys matching an explicit regular expression.
    Pattern { pattern: String },
    /// Keys mentioning a room.
    Room { room_name: String },
    /// Keys mentioning a creep.
    Creep { creep_name: String },
    /// One exact key.
    Object { id: String },
    /// Keys of a room's structures, optionally of one type. `room_name` is required.
    Structure {
        #[serde(default)]
        room_name: Option<String>,
        #[serde(default)]
        structure_type: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A scope plus the namespaces it targets (`None` means every registered one).
pub struct InvalidationScope {
    #[serde(flatten)]
    pub kind: ScopeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespaces: Option<Vec<String>>,
}

impl InvalidationScope {
    pub fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            namespaces: None,
        }
    }

    pub fn global() -> Self {
        Self::new(ScopeKind::Global)
    }

    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self::new(ScopeKind::Pattern {
            pattern: pattern.into(),
        })
    }

    pub fn room(room_name: impl Into<String>) -> Self {
        Self::new(ScopeKind::Room {
            room_name: room_name.into(),
        })
    }

    pub fn creep(creep_name: impl Into<String>) -> Self {
        Self::new(ScopeKind::Creep {
            creep_name: creep_name.into(),
        })
    }

    pub fn object(id: impl Into<String>) -> Self {
        Self::new(ScopeKind::Object { id: id.into() })
    }

    pub fn structure(room_name: impl Into<String>, structure_type: Option<&str>) -> Self {
        Self::new(ScopeKind::Structure {
            room_name: Some(room_name.into()),
            structure_type: structure_type.map(str::to_string),
        })
    }

    /// Restricts the scope to the given namespaces.
    pub fn in_namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.namespaces = Some(namespaces.into_iter().map(Into::into).collect());
        self
    }

    /// Returns `true` if `namespace` is targeted.
    pub fn targets(&self, namespace: &str) -> bool {
        self.namespaces
            .as_ref()
            .is_none_or(|list| list.iter().any(|ns| ns == namespace))
    }
}

/// Concrete action a scope resolves to for one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeAction {
    ClearAll,
    Exact(String),
    /// Regular-expression source, compiled through the pattern cache.
    Pattern(String),
}

impl ScopeKind {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ScopeKind::Global => "global",
            ScopeKind::Pattern { .. } => "pattern",
            ScopeKind::Room { .. } => "room",
            ScopeKind::Creep { .. } => "creep",
            ScopeKind::Object { .. } => "object",
            ScopeKind::Structure { .. } => "structure",
        }
    }

    /// Resolves the scope, or `None` if it lacks an identifier it needs.
    pub fn action(&self) -> Option<ScopeAction> {
        match self {
            ScopeKind::Global => Some(ScopeAction::ClearAll),
            ScopeKind::Pattern { pattern } => {
                (!pattern.is_empty()).then(|| ScopeAction::Pattern(pattern.clone()))
            }
            ScopeKind::Room { room_name } => {
                non_empty(room_name).map(|room| ScopeAction::Pattern(segment_pattern(&room)))
            }
            ScopeKind::Creep { creep_name } => {
                non_empty(creep_name).map(|creep| ScopeAction::Pattern(segment_pattern(&creep)))
            }
            ScopeKind::Object { id } => non_empty(id).map(ScopeAction::Exact),
            ScopeKind::Structure {
                room_name,
                structure_type,
            } => {
                let room = room_name.as_deref().and_then(non_empty)?;
                let pattern = match structure_type.as_deref().and_then(non_empty) {
                    Some(kind) => structure_pattern(&room, &kind),
                    None => segment_pattern(&room),
                };
                Some(ScopeAction::Pattern(pattern))
            }
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Matches keys containing `id` as a whole `:`-delimited segment.
pub fn segment_pattern(id: &str) -> String {
    format!("(?:^|:){}(?::|$)", regex::escape(id))
}

/// Matches keys with a `room` segment followed later by a `structure_type` segment.
pub fn structure_pattern(room: &str, structure_type: &str) -> String {
    format!(
        "(?:^|:){}:(?:.*:)?{}(?::|$)",
        regex::escape(room),
        regex::escape(structure_type)
    )
}
