use log::debug;

use crate::contours::{Boundary, BoundaryHierarchy};
use crate::errors::FailureKind;

/// A matched outer boundary and the hole it encloses
#[derive(Debug, Clone, PartialEq)]
pub struct DonutCandidate {
    pub outer_index: usize,
    pub inner_index: usize,
    pub outer: Boundary,
    pub inner: Boundary,
    pub outer_area: f64,
    pub inner_area: f64,
}

/// Smallest hole area accepted for an image of the given size
pub fn min_hole_area(width: u32, height: u32, fraction: f64) -> f64 {
    width as f64 * height as f64 * fraction
}

/// Outer candidate: has a child, and is either top-level or one level below a top-level boundary
fn is_outer_candidate(hierarchy: &BoundaryHierarchy, index: usize) -> bool {
    let entries = hierarchy.entries();
    let entry = &entries[index];

    if entry.first_child.is_none() {
        return false;
    }

    match entry.parent {
        None => true,
        Some(parent) => entries[parent].parent.is_none(),
    }
}

/// All (outer, first child) pairs that pass the structural and area tests, in trace order
pub fn find_donut_candidates(hierarchy: &BoundaryHierarchy, min_inner_area: f64) -> Vec<DonutCandidate> {
    let entries = hierarchy.entries();
    let boundaries = hierarchy.boundaries();

    (0..hierarchy.len())
        .filter(|&i| is_outer_candidate(hierarchy, i))
        .filter_map(|outer_index| {
            let inner_index = entries[outer_index].first_child?;

            // A subdivided hole is treated as noise
            if entries[inner_index].first_child.is_some() {
                return None;
            }

            let outer = &boundaries[outer_index];
            let inner = &boundaries[inner_index];
            let outer_area = outer.enclosed_area();
            let inner_area = inner.enclosed_area();

            if !outer_area.is_finite() || !inner_area.is_finite() {
                return None;
            }
            if outer_area > inner_area && inner_area > min_inner_area {
                Some(DonutCandidate {
                    outer_index,
                    inner_index,
                    outer: outer.clone(),
                    inner: inner.clone(),
                    outer_area,
                    inner_area,
                })
            } else {
                debug!(
                    "Rejected pair ({}, {}): outer area {:.1}, inner area {:.1}, minimum {:.1}",
                    outer_index, inner_index, outer_area, inner_area, min_inner_area
                );
                None
            }
        })
        .collect()
}

/// Choose the surviving pair with the largest outer area.
///
/// On equal areas the first pair in trace order wins.
pub fn select_donut_pair(
    hierarchy: &BoundaryHierarchy,
    width: u32,
    height: u32,
    min_hole_area_fraction: f64,
) -> std::result::Result<DonutCandidate, FailureKind> {
    let min_inner_area = min_hole_area(width, height, min_hole_area_fraction);
    let candidates = find_donut_candidates(hierarchy, min_inner_area);
    debug!("{} donut candidate(s) survived filtering", candidates.len());

    candidates
        .into_iter()
        .fold(None, |best: Option<DonutCandidate>, candidate| match best {
            Some(current) if current.outer_area >= candidate.outer_area => Some(current),
            _ => Some(candidate),
        })
        .ok_or(FailureKind::NoDonutFound)
}
