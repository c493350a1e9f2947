use std::collections::HashMap;

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use log::debug;

use crate::errors::FailureKind;

/// Whether a boundary encloses a foreground region or a hole inside one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryKind {
    Outer,
    Hole,
}

/// Closed polygon traced along the edge of a foreground region.
///
/// Vertices are pixel coordinates in trace order; the closing edge from the
/// last vertex back to the first is implicit.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    points: Vec<(i32, i32)>,
    kind: BoundaryKind,
}

impl Boundary {
    pub fn new(points: Vec<(i32, i32)>, kind: BoundaryKind) -> Self {
        Self { points, kind }
    }

    pub fn points(&self) -> &[(i32, i32)] {
        &self.points
    }

    pub fn kind(&self) -> BoundaryKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Area enclosed by the polygon (shoelace formula).
    ///
    /// Fewer than three vertices enclose nothing and yield 0.
    pub fn enclosed_area(&self) -> f64 {
        if self.points.len() < 3 {
            return 0.0;
        }

        let n = self.points.len();
        let twice_area: i64 = (0..n)
            .map(|i| {
                let (x0, y0) = self.points[i];
                let (x1, y1) = self.points[(i + 1) % n];
                x0 as i64 * y1 as i64 - x1 as i64 * y0 as i64
            })
            .sum();

        (twice_area as f64 / 2.0).abs()
    }
}

/// Tree links for one boundary; `None` stands for "no such boundary"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HierarchyEntry {
    pub next: Option<usize>,
    pub previous: Option<usize>,
    pub first_child: Option<usize>,
    pub parent: Option<usize>,
}

/// Arena of boundaries plus their parent/child/sibling links, addressed by index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundaryHierarchy {
    boundaries: Vec<Boundary>,
    entries: Vec<HierarchyEntry>,
}

impl BoundaryHierarchy {
    /// Build the sibling and child links from each boundary's parent.
    ///
    /// Parent indices that are out of range or self-referential are dropped,
    /// so every link in the result points into `boundaries`. Siblings keep
    /// the order in which they appear in `boundaries`.
    pub fn from_parents(boundaries: Vec<Boundary>, parents: Vec<Option<usize>>) -> Self {
        let n = boundaries.len();
        let mut entries = vec![HierarchyEntry::default(); n];
        let mut last_in_group: HashMap<Option<usize>, usize> = HashMap::new();

        for i in 0..n {
            let parent = parents
                .get(i)
                .copied()
                .flatten()
                .filter(|&p| p < n && p != i);
            entries[i].parent = parent;

            match last_in_group.insert(parent, i) {
                Some(previous) => {
                    entries[previous].next = Some(i);
                    entries[i].previous = Some(previous);
                }
                None => {
                    if let Some(p) = parent {
                        entries[p].first_child = Some(i);
                    }
                }
            }
        }

        Self { boundaries, entries }
    }

    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    pub fn boundaries(&self) -> &[Boundary] {
        &self.boundaries
    }

    pub fn entries(&self) -> &[HierarchyEntry] {
        &self.entries
    }

    pub fn boundary(&self, index: usize) -> Option<&Boundary> {
        self.boundaries.get(index)
    }

    pub fn entry(&self, index: usize) -> Option<&HierarchyEntry> {
        self.entries.get(index)
    }

    /// Direct children of `index`, in sibling order
    pub fn children(&self, index: usize) -> Vec<usize> {
        let mut children = Vec::new();
        let mut current = self.entries.get(index).and_then(|e| e.first_child);

        while let Some(child) = current {
            if children.len() >= self.entries.len() {
                break;
            }
            children.push(child);
            current = self.entries[child].next;
        }

        children
    }

    /// Number of ancestors above `index` (0 for top-level boundaries)
    pub fn depth(&self, index: usize) -> usize {
        let mut depth = 0;
        let mut current = self.entries.get(index).and_then(|e| e.parent);

        while let Some(parent) = current {
            depth += 1;
            if depth > self.entries.len() {
                break;
            }
            current = self.entries[parent].parent;
        }

        depth
    }
}

/// Trace every closed boundary in a binary bitmap (non-zero = foreground).
///
/// The result is two levels deep: all outer borders are top-level, and each
/// hole border is a child of the outer border of the region surrounding it.
/// Regions sitting inside a hole are therefore also top-level.
pub fn extract_hierarchy(bitmap: &GrayImage) -> std::result::Result<BoundaryHierarchy, FailureKind> {
    let contours = find_contours::<i32>(bitmap);
    if contours.is_empty() {
        return Err(FailureKind::NoBoundariesFound);
    }

    let kinds: Vec<BoundaryKind> = contours
        .iter()
        .map(|c| match c.border_type {
            BorderType::Outer => BoundaryKind::Outer,
            BorderType::Hole => BoundaryKind::Hole,
        })
        .collect();

    let parents: Vec<Option<usize>> = contours
        .iter()
        .zip(&kinds)
        .map(|(contour, kind)| match kind {
            BoundaryKind::Outer => None,
            BoundaryKind::Hole => contour
                .parent
                .filter(|&p| kinds.get(p) == Some(&BoundaryKind::Outer)),
        })
        .collect();

    let boundaries: Vec<Boundary> = contours
        .into_iter()
        .zip(kinds)
        .map(|(contour, kind)| {
            let points = contour.points.iter().map(|p| (p.x, p.y)).collect();
            Boundary::new(points, kind)
        })
        .collect();

    let hierarchy = BoundaryHierarchy::from_parents(boundaries, parents);
    debug!(
        "Traced {} boundaries ({} holes)",
        hierarchy.len(),
        hierarchy
            .boundaries()
            .iter()
            .filter(|b| b.kind() == BoundaryKind::Hole)
            .count()
    );

    Ok(hierarchy)
}
