//! Burr Puzzle Disassembly Planner Library
//!
//! Computes disassembly sequences for rigid voxel burr puzzles whose pieces
//! move only by axis-aligned sliding. A puzzle state is a [`config::Config`];
//! the [`graph::DisassemblyGraph`] searches the implicit graph of states
//! reachable by single subassembly moves and extracts the shortest plan that
//! peels the puzzle down to one piece.

pub mod config;
pub mod graph;
pub mod persistence;
pub mod pieces;
pub mod union_find;
