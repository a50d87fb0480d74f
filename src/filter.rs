use crate::{
    error::{GenError, GenResult},
    geometry::Loc,
    tags::{ConnectivityKind, TagKind, TagSet},
};

use serde::{Deserialize, Serialize};

/// Anything a `RoomFilter` can look at.
pub trait Filterable {
    fn tags(&self) -> &TagSet;
    fn is_hall(&self) -> bool;
    /// Footprint size, in whatever unit the plan uses (cells or tiles).
    fn footprint(&self) -> Loc;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RoomFilter {
    HasTag(TagKind),
    LacksTag(TagKind),
    Connectivity(ConnectivityKind),
    IsRoom,
    IsHall,
    MinSize { x: i32, y: i32 },
}

impl RoomFilter {
    pub fn passes(&self, record: &impl Filterable) -> bool {
        match *self {
            RoomFilter::HasTag(kind) => record.tags().has(kind),
            RoomFilter::LacksTag(kind) => !record.tags().has(kind),
            RoomFilter::Connectivity(c) => record.tags().connectivity() == Some(c),
            RoomFilter::IsRoom => !record.is_hall(),
            RoomFilter::IsHall => record.is_hall(),
            RoomFilter::MinSize { x, y } => {
                let size = record.footprint();
                size.x >= x && size.y >= y
            }
        }
    }
}

/// AND over the whole list; an empty list passes everything.
pub fn passes_all(filters: &[RoomFilter], record: &impl Filterable) -> bool {
    filters.iter().all(|f| f.passes(record))
}

/// The configuration form of a filter, naming tags as text.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum FilterSpec {
    HasTag(String),
    LacksTag(String),
    Connectivity(ConnectivityKind),
    IsRoom,
    IsHall,
    MinSize(i32, i32),
}

impl FilterSpec {
    pub fn compile(&self) -> GenResult<RoomFilter> {
        Ok(match self {
            FilterSpec::HasTag(name) => RoomFilter::HasTag(parse_tag(name)?),
            FilterSpec::LacksTag(name) => RoomFilter::LacksTag(parse_tag(name)?),
            FilterSpec::Connectivity(c) => RoomFilter::Connectivity(*c),
            FilterSpec::IsRoom => RoomFilter::IsRoom,
            FilterSpec::IsHall => RoomFilter::IsHall,
            FilterSpec::MinSize(x, y) => RoomFilter::MinSize { x: *x, y: *y },
        })
    }
}

pub fn compile_filters(specs: &[FilterSpec]) -> GenResult<Vec<RoomFilter>> {
    specs.iter().map(FilterSpec::compile).collect()
}

fn parse_tag(name: &str) -> GenResult<TagKind> {
    name.parse()
        .map_err(|_| GenError::UnknownTag(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::RoomTag;

    struct Stub {
        tags: TagSet,
        hall: bool,
        size: Loc,
    }

    impl Filterable for Stub {
        fn tags(&self) -> &TagSet {
            &self.tags
        }

        fn is_hall(&self) -> bool {
            self.hall
        }

        fn footprint(&self) -> Loc {
            self.size
        }
    }

    #[test]
    fn test_filters_are_anded() {
        let room = Stub {
            tags: TagSet::new().with(RoomTag::BossRoom),
            hall: false,
            size: Loc::new(5, 4),
        };

        assert!(passes_all(&[], &room));
        assert!(passes_all(
            &[RoomFilter::IsRoom, RoomFilter::HasTag(TagKind::BossRoom)],
            &room
        ));
        assert!(!passes_all(
            &[RoomFilter::IsRoom, RoomFilter::MinSize { x: 6, y: 1 }],
            &room
        ));
        assert!(!passes_all(&[RoomFilter::LacksTag(TagKind::BossRoom)], &room));
    }

    #[test]
    fn test_unknown_tag_is_structural_error() {
        let specs = vec![FilterSpec::IsRoom, FilterSpec::HasTag("Treasure".into())];

        assert_eq!(
            compile_filters(&specs),
            Err(GenError::UnknownTag("Treasure".into()))
        );
    }
}
