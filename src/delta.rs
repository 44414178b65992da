use crate::error::{EngineError, Result};

/// A binary tuple of a derived or base relation.
///
/// For the base relation this is an edge `(source, target)`. For the closure it
/// is a reachable pair `(from, to)`, and for the component partition it is
/// `(node, representative)`.
pub type Tuple<N> = (N, N);

/// Direction of a change to a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    /// The tuple is added.
    Insert,
    /// The tuple is removed.
    Delete,
}

impl Direction {
    /// Interpret a signed multiplicity as a direction.
    ///
    /// # Examples
    ///
    /// ```
    /// # use relation_flow::Direction;
    /// assert_eq!(Direction::from_sign(1).unwrap(), Direction::Insert);
    /// assert_eq!(Direction::from_sign(-3).unwrap(), Direction::Delete);
    /// assert!(Direction::from_sign(0).is_err());
    /// ```
    pub fn from_sign(multiplicity: i64) -> Result<Self> {
        match multiplicity.signum() {
            1 => Ok(Direction::Insert),
            -1 => Ok(Direction::Delete),
            _ => Err(EngineError::InvalidDirection(multiplicity)),
        }
    }

    /// The opposite direction.
    pub fn opposite(self) -> Self {
        match self {
            Direction::Insert => Direction::Delete,
            Direction::Delete => Direction::Insert,
        }
    }
}

/// Logical timestamp carried by deltas.
///
/// Ordered by the surrounding coordinator; the engine only copies it from
/// input deltas to the outputs they cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// The beginning of time.
    pub const ZERO: Timestamp = Timestamp(0);
}

/// Validity of a tuple over logical time.
///
/// Stored as the sorted moments at which validity toggles: the tuple becomes
/// valid at `moments[0]`, invalid at `moments[1]`, valid again at `moments[2]`
/// and so on. A tuple that is currently valid has an odd number of moments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timeline {
    moments: Vec<Timestamp>,
}

impl Timeline {
    /// A timeline valid from `start` onwards.
    pub fn since(start: Timestamp) -> Self {
        Self {
            moments: vec![start],
        }
    }

    /// A timeline valid from [`Timestamp::ZERO`] onwards.
    pub fn from_beginning() -> Self {
        Self::since(Timestamp::ZERO)
    }

    /// Toggle moments in ascending order.
    pub fn moments(&self) -> &[Timestamp] {
        &self.moments
    }

    /// Returns true if the tuple is valid at `at`.
    pub fn is_valid_at(&self, at: Timestamp) -> bool {
        self.moments.iter().take_while(|m| **m <= at).count() % 2 == 1
    }

    /// Returns true if the timeline does not end.
    pub fn is_open(&self) -> bool {
        self.moments.len() % 2 == 1
    }
}

/// A single insert-or-delete change to a binary relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Delta<N> {
    /// Whether the tuple is added or removed.
    pub direction: Direction,
    /// The affected tuple.
    pub tuple: Tuple<N>,
    /// Logical time of the change.
    pub timestamp: Timestamp,
}

impl<N> Delta<N> {
    /// Create a delta.
    pub fn new(direction: Direction, source: N, target: N, timestamp: Timestamp) -> Self {
        Self {
            direction,
            tuple: (source, target),
            timestamp,
        }
    }

    /// An insertion at `timestamp`.
    pub fn insert(source: N, target: N, timestamp: Timestamp) -> Self {
        Self::new(Direction::Insert, source, target, timestamp)
    }

    /// A deletion at `timestamp`.
    pub fn delete(source: N, target: N, timestamp: Timestamp) -> Self {
        Self::new(Direction::Delete, source, target, timestamp)
    }

    /// The first element of the tuple.
    pub fn source(&self) -> &N {
        &self.tuple.0
    }

    /// The second element of the tuple.
    pub fn target(&self) -> &N {
        &self.tuple.1
    }
}
