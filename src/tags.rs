//! Per-room tags. A tag set holds at most one tag of each kind; tags are only ever queried by
//! later steps' filters, never consulted while placing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumString};

#[derive(
    Clone, Copy, Debug, Deserialize, Display, EnumString, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum TagKind {
    BossRoom,
    CornerRoom,
    Unvaultable,
    NoConnect,
    NoEvent,
    Connectivity,
    Vault,
    Immutable,
}

/// How a room is reached once the floor is finished.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum ConnectivityKind {
    Main,
    Switch,
    Key,
    BossSealed,
    Detour,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum RoomTag {
    BossRoom,
    CornerRoom,
    Unvaultable,
    NoConnect,
    NoEvent,
    Connectivity(ConnectivityKind),
    Vault,
    Immutable,
}

impl RoomTag {
    pub fn kind(&self) -> TagKind {
        match self {
            RoomTag::BossRoom => TagKind::BossRoom,
            RoomTag::CornerRoom => TagKind::CornerRoom,
            RoomTag::Unvaultable => TagKind::Unvaultable,
            RoomTag::NoConnect => TagKind::NoConnect,
            RoomTag::NoEvent => TagKind::NoEvent,
            RoomTag::Connectivity(_) => TagKind::Connectivity,
            RoomTag::Vault => TagKind::Vault,
            RoomTag::Immutable => TagKind::Immutable,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct TagSet {
    slots: BTreeMap<TagKind, RoomTag>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tag: RoomTag) -> Self {
        self.set(tag);

        self
    }

    /// Overwrites whatever tag of the same kind was there.
    pub fn set(&mut self, tag: RoomTag) {
        self.slots.insert(tag.kind(), tag);
    }

    pub fn get(&self, kind: TagKind) -> Option<&RoomTag> {
        self.slots.get(&kind)
    }

    pub fn has(&self, kind: TagKind) -> bool {
        self.slots.contains_key(&kind)
    }

    pub fn remove(&mut self, kind: TagKind) -> Option<RoomTag> {
        self.slots.remove(&kind)
    }

    pub fn connectivity(&self) -> Option<ConnectivityKind> {
        match self.get(TagKind::Connectivity) {
            Some(RoomTag::Connectivity(c)) => Some(*c),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
