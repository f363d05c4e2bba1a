use serde::{Deserialize, Serialize};
use std::fmt;

/// A stimulus dimension drawn from a small finite alphabet
pub trait Stimulus: Copy + Clone + PartialEq + Send + Sync + fmt::Debug {
    /// Number of distinct values in the alphabet
    const CARDINALITY: usize;

    fn from_index(index: usize) -> Self;
    fn index(&self) -> usize;
}

/// Cell of the 3×3 grid, numbered row-major from the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(u8);

impl Position {
    pub const GRID_SIDE: usize = 3;

    pub fn new(index: u8) -> Option<Self> {
        ((index as usize) < Self::CARDINALITY).then_some(Position(index))
    }

    pub fn row(&self) -> usize {
        self.0 as usize / Self::GRID_SIDE
    }

    pub fn column(&self) -> usize {
        self.0 as usize % Self::GRID_SIDE
    }
}

impl Stimulus for Position {
    const CARDINALITY: usize = 9;

    fn from_index(index: usize) -> Self {
        Position((index % Self::CARDINALITY) as u8)
    }

    fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Spoken letters. Chosen to be acoustically distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Letter {
    C,
    H,
    K,
    L,
    Q,
    R,
    S,
    T,
}

impl Letter {
    pub const ALL: [Letter; 8] = [
        Letter::C,
        Letter::H,
        Letter::K,
        Letter::L,
        Letter::Q,
        Letter::R,
        Letter::S,
        Letter::T,
    ];

    pub fn as_char(&self) -> char {
        match self {
            Letter::C => 'C',
            Letter::H => 'H',
            Letter::K => 'K',
            Letter::L => 'L',
            Letter::Q => 'Q',
            Letter::R => 'R',
            Letter::S => 'S',
            Letter::T => 'T',
        }
    }
}

impl Stimulus for Letter {
    const CARDINALITY: usize = Letter::ALL.len();

    fn from_index(index: usize) -> Self {
        Letter::ALL[index % Self::CARDINALITY]
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// The two independently scored stimulus channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Position,
    Audio,
}

impl Modality {
    pub const BOTH: [Modality; 2] = [Modality::Position, Modality::Audio];
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::Position => f.write_str("position"),
            Modality::Audio => f.write_str("audio"),
        }
    }
}
