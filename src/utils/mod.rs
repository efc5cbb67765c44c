//! Shared utilities: bit sets and the graph abstractions the analyses are written against.

mod bitset;
pub mod graph;

pub use bitset::{BitSet, BitSetIter};
