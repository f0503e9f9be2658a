//! Topology maps the 2-D mini-column grid onto a flat, row-major index space.
//! It converts between linear indices and `(x, y)` coordinates and walks the Euclidean disc
//! of cells within a radius of a center cell, clipped at the grid edges.
//!
//! The grid uses it twice while building: once to decide which coordinates get a mini-column
//! (the whole rectangle, or only the inscribed disc), and once per cell to enumerate the
//! neighbors that go into its neighbor list.

use serde::{Deserialize, Serialize};

/// Integer coordinates of a grid location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coords {
    pub x: usize,
    pub y: usize,
}

impl Coords {
    #[inline]
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other` in cell units.
    #[inline]
    pub fn distance(&self, other: &Coords) -> f32 {
        let dx = self.x as f32 - other.x as f32;
        let dy = self.y as f32 - other.y as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Shape of the grid with row-major index conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    width: usize,
    height: usize,
}

impl Topology {
    #[inline]
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of grid locations, allocated or not.
    #[inline]
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Converts a linear index into grid coordinates.
    #[inline]
    pub fn coordinates(&self, index: usize) -> Coords {
        Coords::new(index % self.width, index / self.width)
    }

    /// Converts coordinates into a linear index, or `None` if they fall outside the grid.
    #[inline]
    pub fn index(&self, coords: Coords) -> Option<usize> {
        (coords.x < self.width && coords.y < self.height)
            .then(|| coords.y * self.width + coords.x)
    }

    /// True if `coords` lies inside the disc inscribed in the grid rectangle.
    #[inline]
    pub fn in_center_disc(&self, coords: Coords) -> bool {
        let cx = (self.width as f32 - 1.0) / 2.0;
        let cy = (self.height as f32 - 1.0) / 2.0;
        let r = self.width.min(self.height) as f32 / 2.0;
        let dx = coords.x as f32 - cx;
        let dy = coords.y as f32 - cy;
        dx * dx + dy * dy <= r * r
    }

    /// Returns an iterator over every location within Euclidean `radius` of `center`,
    /// excluding `center` itself. Each item is `(index, distance)`.
    #[inline]
    pub fn disc(&self, center: usize, radius: f32) -> DiscIter<'_> {
        let c = self.coordinates(center);
        // Nothing lies further out than the larger side, however big the radius.
        let reach = (radius.floor().max(0.0) as usize).min(self.width.max(self.height));

        DiscIter {
            topology: self,
            center: c,
            radius,
            x_range: (c.x.saturating_sub(reach), (c.x + reach).min(self.width - 1)),
            y_end: (c.y + reach).min(self.height - 1),
            cursor: Some(Coords::new(c.x.saturating_sub(reach), c.y.saturating_sub(reach))),
        }
    }
}

/// Walks the bounding square of a disc row by row and yields the locations inside it.
pub struct DiscIter<'a> {
    topology: &'a Topology,
    center: Coords,
    radius: f32,
    x_range: (usize, usize),
    y_end: usize,
    cursor: Option<Coords>,
}

impl DiscIter<'_> {
    fn advance(&mut self) {
        self.cursor = self.cursor.and_then(|c| {
            if c.x < self.x_range.1 {
                Some(Coords::new(c.x + 1, c.y))
            } else if c.y < self.y_end {
                Some(Coords::new(self.x_range.0, c.y + 1))
            } else {
                None
            }
        });
    }
}

impl Iterator for DiscIter<'_> {
    type Item = (usize, f32);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let current = self.cursor?;
            self.advance();

            if current == self.center {
                continue;
            }
            let distance = self.center.distance(&current);
            if distance <= self.radius {
                if let Some(index) = self.topology.index(current) {
                    return Some((index, distance));
                }
            }
        }
    }
}
