//! Seeded 4-connected flood fill over a shared visitation mask.
//!
//! [`VisitedMask`] records every pixel that has been examined, whether or
//! not it turned out to be bright. [`ClusterBuilder`] grows one cluster from
//! a seed pixel, marking each neighbor as it is examined so that no pixel is
//! looked at twice across an entire scan.
//!
//! The fill is depth-first with a fixed neighbor order (right, up, left,
//! down) and runs on an explicit frame stack. Each frame remembers which
//! neighbor it examines next, so the discovery order is exactly that of the
//! equivalent recursive fill while the depth is bounded by heap memory
//! rather than the thread stack.

use ndarray::Array2;

use super::detection::DetectionError;
use super::grid::PixelGrid;

/// Boolean grid tracking which pixels have been examined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitedMask {
    marks: Array2<bool>,
}

impl VisitedMask {
    /// All-false mask of shape `(n_rows, n_cols)`.
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self {
            marks: Array2::from_elem((n_rows, n_cols), false),
        }
    }

    /// Mask matching the shape of `grid`.
    pub fn for_grid(grid: &PixelGrid) -> Self {
        Self::new(grid.n_rows(), grid.n_cols())
    }

    pub fn shape(&self) -> (usize, usize) {
        self.marks.dim()
    }

    pub fn is_visited(&self, row: usize, col: usize) -> bool {
        self.marks[[row, col]]
    }

    /// Mark a pixel as examined.
    ///
    /// Idempotent. Returns `true` only when the pixel was not yet visited.
    pub fn mark_visited(&mut self, row: usize, col: usize) -> bool {
        let mark = &mut self.marks[[row, col]];
        let newly = !*mark;
        *mark = true;
        newly
    }

    pub fn visited_count(&self) -> usize {
        self.marks.iter().filter(|&&m| m).count()
    }

    /// True once every pixel has been examined.
    pub fn is_complete(&self) -> bool {
        self.marks.iter().all(|&m| m)
    }
}

/// Neighbor directions in examination order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Right,
    Up,
    Left,
    Down,
}

const NEIGHBOR_ORDER: [Direction; 4] = [
    Direction::Right,
    Direction::Up,
    Direction::Left,
    Direction::Down,
];

impl Direction {
    /// Neighbor of `(row, col)` in this direction, if it lies in the grid.
    fn step(self, row: usize, col: usize, n_rows: usize, n_cols: usize) -> Option<(usize, usize)> {
        match self {
            Direction::Right if col + 1 < n_cols => Some((row, col + 1)),
            Direction::Up if row > 0 => Some((row - 1, col)),
            Direction::Left if col > 0 => Some((row, col - 1)),
            Direction::Down if row + 1 < n_rows => Some((row + 1, col)),
            _ => None,
        }
    }
}

/// Pixel membership and summed luminosity of one cluster.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterMembership {
    /// Member pixels as `(row, col)` in discovery order; the seed comes first
    pub pixels: Vec<(usize, usize)>,
    /// Sum of the grid values of all member pixels
    pub integrated_luminosity: f64,
}

/// One pending pixel on the fill stack.
#[derive(Debug, Clone, Copy)]
struct Frame {
    row: usize,
    col: usize,
    /// Index into [`NEIGHBOR_ORDER`] of the next neighbor to examine
    next: usize,
}

/// Grows a single cluster from a seed pixel.
#[derive(Debug, Clone, Copy)]
pub struct ClusterBuilder<'a> {
    grid: &'a PixelGrid,
    threshold: f64,
    max_pixels: Option<usize>,
}

impl<'a> ClusterBuilder<'a> {
    pub fn new(grid: &'a PixelGrid, threshold: f64) -> Self {
        Self {
            grid,
            threshold,
            max_pixels: None,
        }
    }

    /// Cap the number of pixels a single cluster may hold.
    pub fn with_max_pixels(mut self, max_pixels: Option<usize>) -> Self {
        self.max_pixels = max_pixels;
        self
    }

    /// Explore the cluster containing `seed`.
    ///
    /// The seed must satisfy `value >= threshold`; it is marked visited here
    /// if the caller has not already done so. Every neighbor examined during
    /// the fill is marked in `mask`, including the ones below threshold.
    ///
    /// # Errors
    /// [`DetectionError::ClusterTooLarge`] when the cluster exceeds the
    /// configured pixel cap or its bookkeeping cannot be allocated.
    pub fn explore(
        &self,
        seed: (usize, usize),
        mask: &mut VisitedMask,
    ) -> Result<ClusterMembership, DetectionError> {
        let (n_rows, n_cols) = self.grid.dim();
        let mut membership = ClusterMembership::default();
        let mut stack: Vec<Frame> = Vec::new();

        mask.mark_visited(seed.0, seed.1);
        self.admit(seed, seed, &mut membership, &mut stack)?;

        while let Some(frame) = stack.last_mut() {
            if frame.next == NEIGHBOR_ORDER.len() {
                stack.pop();
                continue;
            }
            let direction = NEIGHBOR_ORDER[frame.next];
            frame.next += 1;

            let Some((row, col)) = direction.step(frame.row, frame.col, n_rows, n_cols) else {
                continue;
            };
            if mask.mark_visited(row, col) && self.grid.value(row, col) >= self.threshold {
                self.admit((row, col), seed, &mut membership, &mut stack)?;
            }
        }

        Ok(membership)
    }

    /// Append a qualifying pixel to the cluster and schedule its neighbors.
    fn admit(
        &self,
        pixel: (usize, usize),
        seed: (usize, usize),
        membership: &mut ClusterMembership,
        stack: &mut Vec<Frame>,
    ) -> Result<(), DetectionError> {
        let count = membership.pixels.len();
        if let Some(limit) = self.max_pixels {
            if count >= limit {
                return Err(DetectionError::ClusterTooLarge { seed, limit });
            }
        }
        let too_large = |_| DetectionError::ClusterTooLarge { seed, limit: count };
        membership.pixels.try_reserve(1).map_err(too_large)?;
        stack.try_reserve(1).map_err(too_large)?;

        membership.pixels.push(pixel);
        membership.integrated_luminosity += self.grid.value(pixel.0, pixel.1);
        stack.push(Frame {
            row: pixel.0,
            col: pixel.1,
            next: 0,
        });
        Ok(())
    }
}
