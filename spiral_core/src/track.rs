//! Track records and their bounded observation window.

use std::collections::VecDeque;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Rotation sense of a phase singularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SingularityKind {
    /// Circulation of `+2π`.
    Spiral,
    /// Circulation of `-2π`.
    AntiSpiral,
}

impl SingularityKind {
    pub const ALL: [SingularityKind; 2] = [SingularityKind::Spiral, SingularityKind::AntiSpiral];

    pub fn as_str(&self) -> &'static str {
        match self {
            SingularityKind::Spiral => "spiral",
            SingularityKind::AntiSpiral => "anti_spiral",
        }
    }
}

impl Display for SingularityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Integer `(row, col)` position in zoomed-grid space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPoint {
    pub row: usize,
    pub col: usize,
}

impl GridPoint {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Squared Euclidean distance.
    pub fn distance_sq(&self, other: &GridPoint) -> f64 {
        let dr = self.row as f64 - other.row as f64;
        let dc = self.col as f64 - other.col as f64;
        dr * dr + dc * dc
    }
}

impl From<(usize, usize)> for GridPoint {
    fn from((row, col): (usize, usize)) -> Self {
        Self { row, col }
    }
}

/// Identifier assigned in creation order within one condition run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub u64);

impl Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One sighting of a track: where it was and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub point: GridPoint,
    pub time_index: usize,
}

/// Fixed-capacity FIFO of the most recent observations.
///
/// Positions and time indices live in the same entry, so the two sequences
/// can never drift apart in length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackWindow {
    capacity: usize,
    entries: VecDeque<Observation>,
}

impl TrackWindow {
    /// `capacity` is clamped to at least one entry.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::new(),
        }
    }

    /// Append an observation, evicting the oldest once full.
    pub fn push(&mut self, observation: Observation) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(observation);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&Observation> {
        self.entries.back()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Observation> + '_ {
        self.entries.iter()
    }
}

/// A spiral or anti-spiral followed across consecutive frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    id: TrackId,
    kind: SingularityKind,
    window: TrackWindow,
    start_time: usize,
    end_time: usize,
}

impl Track {
    /// Open a track seeded by a single detection.
    pub fn new(
        id: TrackId,
        kind: SingularityKind,
        point: GridPoint,
        time_index: usize,
        max_points: usize,
    ) -> Self {
        let mut window = TrackWindow::new(max_points);
        window.push(Observation { point, time_index });
        Self {
            id,
            kind,
            window,
            start_time: time_index,
            end_time: time_index,
        }
    }

    /// Record a continuation at `time_index`.
    pub fn extend(&mut self, point: GridPoint, time_index: usize) {
        debug_assert!(time_index >= self.end_time);
        self.window.push(Observation { point, time_index });
        self.end_time = time_index;
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn kind(&self) -> SingularityKind {
        self.kind
    }

    pub fn start_time(&self) -> usize {
        self.start_time
    }

    pub fn end_time(&self) -> usize {
        self.end_time
    }

    /// Number of frames between the first and last sighting, inclusive.
    pub fn duration(&self) -> usize {
        self.end_time - self.start_time + 1
    }

    /// Retained observations (at most the window capacity).
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn observations(&self) -> impl Iterator<Item = &Observation> + '_ {
        self.window.iter()
    }

    pub fn points(&self) -> impl Iterator<Item = GridPoint> + '_ {
        self.window.iter().map(|obs| obs.point)
    }

    pub fn time_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.window.iter().map(|obs| obs.time_index)
    }

    pub fn last_point(&self) -> Option<GridPoint> {
        self.window.last().map(|obs| obs.point)
    }

    /// Whether `time_index` falls inside `[start_time, end_time]`.
    pub fn spans(&self, time_index: usize) -> bool {
        self.start_time <= time_index && time_index <= self.end_time
    }

    /// Retained positions observed at or before `time_index`, oldest first.
    /// This is the polyline a display draws for the track at that instant.
    pub fn trail_until(&self, time_index: usize) -> Vec<GridPoint> {
        self.window
            .iter()
            .take_while(|obs| obs.time_index <= time_index)
            .map(|obs| obs.point)
            .collect()
    }
}
