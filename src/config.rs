//! One puzzle configuration: the placement of every remaining piece plus the
//! acceleration structures derived from it.
//!
//! A configuration is immutable once `build_accel_structures` has run. Sliding
//! or removing a subassembly never mutates in place; it produces a brand-new
//! `Config` with its own derived structures. The derived data is:
//!
//! - the bounding box over all placed voxels,
//! - two run-length-encoded occupancy projections (per z-row along x, per
//!   x-column along z) with prefix-length indices for binary search,
//! - the piece adjacency graph (4-neighbor cell scan).
//!
//! The RLE projections make the per-direction movability query a binary search
//! plus a short run walk instead of a cell-by-cell ray march.

use std::ops::ControlFlow;
use std::rc::Rc;

use log::debug;
use rand::Rng;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::pieces::{Piece, PieceState, PlacedPiece};
use crate::union_find::UnionFind;

/// Flat RGB color assigned to a piece for display purposes only.
pub type Material = [f32; 3];

/// The four axis-aligned sliding directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Back,
    Forward,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Back,
        Direction::Forward,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit (dx, dz) step for this direction.
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::Back => (0, -1),
            Direction::Forward => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

/// One run of an RLE occupancy projection: `len` consecutive cells owned by
/// the same piece, or empty when `piece` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Run {
    piece: Option<usize>,
    len: i32,
}

/// Axis-aligned bounding box over all placed voxels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounds {
    pub min_x: i32,
    pub min_z: i32,
    pub size_x: i32,
    pub size_z: i32,
}

/// A single arrangement of the remaining puzzle pieces.
pub struct Config {
    /// Piece ID -> shared shape + per-configuration placement.
    data: FxHashMap<usize, PlacedPiece>,
    /// Sorted piece IDs, for deterministic enumeration order.
    piece_ids: Vec<usize>,
    /// Disassembly moves from the current search root to reach this state.
    depth: i32,
    /// Piece count of the full puzzle when graph construction started.
    original_piece_num: usize,

    materials: FxHashMap<usize, Material>,

    // Derived by build_accel_structures, frozen afterwards.
    bounds: Bounds,
    adjacency: FxHashMap<usize, FxHashSet<usize>>,
    rle_x: Vec<Vec<Run>>,
    pre_x: Vec<Vec<i32>>,
    rle_z: Vec<Vec<Run>>,
    pre_z: Vec<Vec<i32>>,
}

impl Config {
    pub fn new(depth: i32, original_piece_num: usize) -> Self {
        Self {
            data: FxHashMap::default(),
            piece_ids: Vec::new(),
            depth,
            original_piece_num,
            materials: FxHashMap::default(),
            bounds: Bounds::default(),
            adjacency: FxHashMap::default(),
            rle_x: Vec::new(),
            pre_x: Vec::new(),
            rle_z: Vec::new(),
            pre_z: Vec::new(),
        }
    }

    /// Builds the root configuration for a freshly imported puzzle: every
    /// piece at offset zero, depth zero.
    pub fn from_pieces(pieces: Vec<Rc<Piece>>) -> Self {
        let mut config = Self::new(0, pieces.len());
        for (id, piece) in pieces.into_iter().enumerate() {
            config.add_piece(id, piece);
        }
        config.build_accel_structures();
        config
    }

    pub fn add_piece(&mut self, id: usize, piece: Rc<Piece>) {
        self.add_placed_piece(id, PlacedPiece::new(piece));
    }

    pub fn add_placed_piece(&mut self, id: usize, placed: PlacedPiece) {
        if let Err(pos) = self.piece_ids.binary_search(&id) {
            self.piece_ids.insert(pos, id);
        }
        self.data.insert(id, placed);
    }

    /// Copies a material from a parent configuration so colors stay stable
    /// while stepping through a disassembly plan.
    pub fn set_piece_material(&mut self, id: usize, material: Material) {
        self.materials.insert(id, material);
    }

    pub fn material(&self, id: usize) -> Option<Material> {
        self.materials.get(&id).copied()
    }

    pub fn depth(&self) -> i32 {
        self.depth
    }

    pub fn piece_count(&self) -> usize {
        self.data.len()
    }

    pub fn removed_piece_count(&self) -> usize {
        self.original_piece_num - self.data.len()
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn piece_ids(&self) -> &[usize] {
        &self.piece_ids
    }

    pub fn state(&self, id: usize) -> Option<PieceState> {
        self.data.get(&id).map(|placed| placed.state)
    }

    /// True iff no piece has been removed relative to the full puzzle, where
    /// `delta` accounts for pieces already peeled off in earlier search phases.
    pub fn is_full_config(&self, delta: usize) -> bool {
        self.data.len() == self.original_piece_num - delta
    }

    /// Computes the bounding box, RLE occupancy projections and adjacency
    /// graph from the current placements. Call exactly once, before queries.
    pub fn build_accel_structures(&mut self) {
        self.bounds = self.calculate_bounds();

        let size_x = self.bounds.size_x as usize;
        let size_z = self.bounds.size_z as usize;
        let mut occupied = vec![vec![None; size_z]; size_x];
        for &id in &self.piece_ids {
            for (wx, wz) in self.data[&id].world_voxels() {
                let x = (wx - self.bounds.min_x) as usize;
                let z = (wz - self.bounds.min_z) as usize;
                occupied[x][z] = Some(id);
            }
        }

        self.build_rle_maps(&occupied);
        self.build_adjacency_graph(&occupied);
    }

    fn calculate_bounds(&self) -> Bounds {
        let mut min_x = i32::MAX;
        let mut min_z = i32::MAX;
        let mut max_x = i32::MIN;
        let mut max_z = i32::MIN;

        for placed in self.data.values() {
            for (x, z) in placed.world_voxels() {
                min_x = min_x.min(x);
                min_z = min_z.min(z);
                max_x = max_x.max(x);
                max_z = max_z.max(z);
            }
        }

        Bounds {
            min_x,
            min_z,
            size_x: max_x - min_x + 1,
            size_z: max_z - min_z + 1,
        }
    }

    fn build_rle_maps(&mut self, occupied: &[Vec<Option<usize>>]) {
        let size_x = self.bounds.size_x as usize;
        let size_z = self.bounds.size_z as usize;

        self.rle_x = (0..size_z)
            .map(|z| encode_runs((0..size_x).map(|x| occupied[x][z])))
            .collect();
        self.pre_x = self.rle_x.iter().map(|runs| prefix_lengths(runs)).collect();

        self.rle_z = (0..size_x)
            .map(|x| encode_runs(occupied[x].iter().copied()))
            .collect();
        self.pre_z = self.rle_z.iter().map(|runs| prefix_lengths(runs)).collect();
    }

    fn build_adjacency_graph(&mut self, occupied: &[Vec<Option<usize>>]) {
        let size_x = self.bounds.size_x;
        let size_z = self.bounds.size_z;

        self.adjacency = self
            .piece_ids
            .iter()
            .map(|&id| (id, FxHashSet::default()))
            .collect();

        for x in 0..size_x {
            for z in 0..size_z {
                let Some(id) = occupied[x as usize][z as usize] else {
                    continue;
                };
                for dir in Direction::ALL {
                    let (dx, dz) = dir.delta();
                    let (nx, nz) = (x + dx, z + dz);
                    if nx < 0 || nx >= size_x || nz < 0 || nz >= size_z {
                        continue;
                    }
                    match occupied[nx as usize][nz as usize] {
                        Some(other) if other != id => {
                            self.adjacency.get_mut(&id).unwrap().insert(other);
                        }
                        _ => {}
                    }
                }
            }
        }

        debug!("adjacency graph built over {} pieces", self.piece_ids.len());
    }

    /// Structural equality up to a uniform translation of the whole assembly:
    /// same piece-ID set, same bounding-box size, and identical bounding-box
    /// relative offsets per piece. Sliding the whole assembly across the grid
    /// shifts the bounding box but not this comparison.
    pub fn is_equal_to(&self, other: &Config) -> bool {
        if self.data.len() != other.data.len()
            || self.bounds.size_x != other.bounds.size_x
            || self.bounds.size_z != other.bounds.size_z
        {
            return false;
        }

        self.data.iter().all(|(id, placed)| {
            other.data.get(id).is_some_and(|other_placed| {
                placed.state.offset_x - self.bounds.min_x
                    == other_placed.state.offset_x - other.bounds.min_x
                    && placed.state.offset_z - self.bounds.min_z
                        == other_placed.state.offset_z - other.bounds.min_z
            })
        })
    }

    /// Maximum distance the subassembly can slide in `dir` before hitting a
    /// piece outside it. `None` means nothing ever blocks the way: the
    /// subassembly can be removed outright.
    pub fn max_movable_distance(
        &self,
        subassembly: &FxHashSet<usize>,
        dir: Direction,
    ) -> Option<i32> {
        let (dx, dz) = dir.delta();
        let mut limit: Option<i32> = None;

        for &id in subassembly {
            for (wx, wz) in self.data[&id].world_voxels() {
                let x = wx - self.bounds.min_x;
                let z = wz - self.bounds.min_z;

                let blocked = if dx != 0 {
                    self.walk_runs(&self.rle_x[z as usize], &self.pre_x[z as usize], x, dx, subassembly)
                } else {
                    self.walk_runs(&self.rle_z[x as usize], &self.pre_z[x as usize], z, dz, subassembly)
                };

                if let Some(dist) = blocked {
                    limit = Some(limit.map_or(dist, |d| d.min(dist)));
                }
            }
        }

        limit
    }

    /// Walks runs outward from the run containing `coord` in direction `step`
    /// (+1/-1). Returns the movable distance if a blocking run is found.
    fn walk_runs(
        &self,
        runs: &[Run],
        pre: &[i32],
        coord: i32,
        step: i32,
        subassembly: &FxHashSet<usize>,
    ) -> Option<i32> {
        // prefix index is sorted: locate the run covering `coord`
        let mut idx = pre.partition_point(|&p| p <= coord) as isize - 1;

        while idx >= 0 && (idx as usize) < runs.len() {
            let run = runs[idx as usize];
            if let Some(other) = run.piece {
                if !subassembly.contains(&other) {
                    // nearest cell of the blocking run, seen from `coord`
                    let block_coord = if step < 0 {
                        pre[idx as usize + 1] - 1
                    } else {
                        pre[idx as usize + 1] - run.len
                    };
                    return Some((coord - block_coord).abs() - 1);
                }
            }
            idx += step as isize;
        }

        None
    }

    /// Enumerates every configuration reachable by one disassembly move.
    ///
    /// Connected subassemblies of at most half the remaining pieces are tried
    /// in each direction. A subassembly that can slide 1..=d steps yields one
    /// neighbor per step distance. The first subassembly found to be fully
    /// removable short-circuits everything else: the complement-only
    /// configuration becomes the single result. That pruning is what lets the
    /// planner's search terminate; it trades away "best removal" for "some
    /// removal".
    pub fn neighbor_configs(&self) -> Vec<Config> {
        let mut neighbors = Vec::new();
        if self.piece_ids.len() <= 1 {
            return neighbors;
        }

        let mut oracle = self.build_subassembly_oracle();
        let mut chosen = Vec::new();
        let mut visit = |chosen: &[usize]| self.visit_subassembly(chosen, &mut neighbors);
        let _ = self.enumerate_subassemblies(0, &mut oracle, &mut chosen, &mut visit);

        debug!(
            "generated {} neighbor configs at depth {}",
            neighbors.len(),
            self.depth + 1
        );
        neighbors
    }

    /// Union-find over piece positions, united along adjacency edges.
    fn build_subassembly_oracle(&self) -> UnionFind {
        let mut oracle = UnionFind::new(self.piece_ids.len());
        for (pos, id) in self.piece_ids.iter().enumerate() {
            for adj in &self.adjacency[id] {
                if let Ok(adj_pos) = self.piece_ids.binary_search(adj) {
                    oracle.union(pos, adj_pos);
                }
            }
        }
        oracle
    }

    /// Backtracking enumeration over piece positions in increasing order. A
    /// candidate position is admitted only if the oracle connects it to the
    /// most recently inserted one, so only connected subsets are visited
    /// without re-deriving connectivity per subset. The visitor fires for
    /// every non-empty subset of at most half the remaining pieces.
    fn enumerate_subassemblies(
        &self,
        start: usize,
        oracle: &mut UnionFind,
        chosen: &mut Vec<usize>,
        visit: &mut dyn FnMut(&[usize]) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        let n = self.piece_ids.len();
        if !chosen.is_empty() && chosen.len() <= (n + 1) / 2 {
            visit(chosen)?;
        }

        for pos in start..n {
            let anchor = chosen.last().copied().unwrap_or(0);
            if oracle.connected(pos, anchor) {
                chosen.push(pos);
                self.enumerate_subassemblies(pos + 1, oracle, chosen, visit)?;
                chosen.pop();
            }
        }

        ControlFlow::Continue(())
    }

    fn visit_subassembly(
        &self,
        chosen: &[usize],
        neighbors: &mut Vec<Config>,
    ) -> ControlFlow<()> {
        let subassembly: FxHashSet<usize> =
            chosen.iter().map(|&pos| self.piece_ids[pos]).collect();

        for dir in Direction::ALL {
            match self.max_movable_distance(&subassembly, dir) {
                None => {
                    debug!("subassembly {:?} removable towards {:?}", subassembly, dir);
                    neighbors.clear();
                    neighbors.push(self.removal_config(&subassembly));
                    return ControlFlow::Break(());
                }
                Some(steps) => {
                    for dist in 1..=steps {
                        neighbors.push(self.slide_config(&subassembly, dir, dist));
                    }
                }
            }
        }

        ControlFlow::Continue(())
    }

    /// The configuration left behind after the subassembly is taken out.
    fn removal_config(&self, subassembly: &FxHashSet<usize>) -> Config {
        let mut config = Config::new(self.depth + 1, self.original_piece_num);
        for (&id, placed) in &self.data {
            if !subassembly.contains(&id) {
                config.add_placed_piece(id, placed.clone());
                if let Some(material) = self.material(id) {
                    config.set_piece_material(id, material);
                }
            }
        }
        config.build_accel_structures();
        config
    }

    /// The configuration with the subassembly slid `dist` steps along `dir`.
    fn slide_config(&self, subassembly: &FxHashSet<usize>, dir: Direction, dist: i32) -> Config {
        let (dx, dz) = dir.delta();
        let mut config = Config::new(self.depth + 1, self.original_piece_num);
        for (&id, placed) in &self.data {
            let mut placed = placed.clone();
            if subassembly.contains(&id) {
                placed.state = placed.state.translated(dx, dz, dist);
            }
            config.add_placed_piece(id, placed);
            if let Some(material) = self.material(id) {
                config.set_piece_material(id, material);
            }
        }
        config.build_accel_structures();
        config
    }

    /// Greedy adjacency coloring over a growing palette of random colors, so
    /// touching pieces never share a color. Colors are display-only.
    pub fn assign_piece_materials(&mut self, rng: &mut impl Rng) {
        if self.piece_ids.is_empty() {
            return;
        }

        let mut palette: Vec<Material> = vec![random_color(rng)];
        let mut palette_index: FxHashMap<usize, usize> = FxHashMap::default();
        palette_index.insert(self.piece_ids[0], 0);

        let ids = self.piece_ids.clone();
        for &id in &ids[1..] {
            let mut color_index = 0;
            while self.adjacency[&id]
                .iter()
                .any(|adj| palette_index.get(adj) == Some(&color_index))
            {
                color_index += 1;
                if color_index == palette.len() {
                    palette.push(random_color(rng));
                    break;
                }
            }
            palette_index.insert(id, color_index);
        }

        for (id, index) in palette_index {
            self.materials.insert(id, palette[index]);
        }
    }

    /// Renders the occupancy as ASCII rows straight from the RLE projection,
    /// top row first. Piece IDs print as hex-ish digits, empty cells as '.'.
    pub fn format_grid(&self) -> String {
        let mut rows = Vec::with_capacity(self.bounds.size_z as usize);
        for z in (0..self.bounds.size_z).rev() {
            let mut row = String::with_capacity(self.bounds.size_x as usize);
            for run in &self.rle_x[z as usize] {
                let cell = match run.piece {
                    None => '.',
                    Some(id) if id < 10 => char::from(b'0' + id as u8),
                    Some(id) if id < 36 => char::from(b'a' + (id - 10) as u8),
                    Some(_) => '#',
                };
                for _ in 0..run.len {
                    row.push(cell);
                }
            }
            rows.push(row);
        }
        rows.join("\n")
    }
}

/// Run-length encodes one row/column of the occupancy grid.
fn encode_runs(cells: impl Iterator<Item = Option<usize>>) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for cell in cells {
        match runs.last_mut() {
            Some(run) if run.piece == cell => run.len += 1,
            _ => runs.push(Run { piece: cell, len: 1 }),
        }
    }
    runs
}

/// Prefix sums over run lengths; `pre[i]` is the coordinate where run `i`
/// starts, `pre[len]` the row length. Enables binary search by coordinate.
fn prefix_lengths(runs: &[Run]) -> Vec<i32> {
    let mut pre = Vec::with_capacity(runs.len() + 1);
    pre.push(0);
    for run in runs {
        pre.push(pre.last().copied().unwrap_or(0) + run.len);
    }
    pre
}

/// Random color channel drawn from a piecewise distribution that favors the
/// mid range, keeping piece colors distinguishable but not garish.
fn random_channel(rng: &mut impl Rng) -> f32 {
    const SEGMENTS: [f32; 4] = [0.0, 0.4, 0.7, 1.0];
    const WEIGHTS: [i32; 3] = [1, 5, 1];

    let total: i32 = WEIGHTS.iter().sum();
    let pick = rng.random_range(0.0..total as f32);

    let mut acc = 0;
    let mut segment = WEIGHTS.len() - 1;
    for (i, &w) in WEIGHTS.iter().enumerate() {
        acc += w;
        if pick < acc as f32 {
            segment = i;
            break;
        }
    }

    rng.random_range(SEGMENTS[segment]..SEGMENTS[segment + 1])
}

fn random_color(rng: &mut impl Rng) -> Material {
    [
        random_channel(rng),
        random_channel(rng),
        random_channel(rng),
    ]
}
