//! Detection-to-track association.

use std::cmp::Ordering;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::tracker::rect::{Rect, iou_batch};

/// One detector box for the current frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Bounding box in pixels.
    pub bbox: Rect,
    /// Detector confidence in `[0, 1]`.
    pub score: f32,
}

impl Detection {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Self {
        Self {
            bbox: Rect::from_tlbr(x1, y1, x2, y2),
            score,
        }
    }

    pub fn from_rect(bbox: Rect, score: f32) -> Self {
        Self { bbox, score }
    }
}

/// How the cost matrix is turned into pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStrategy {
    /// Cheapest pair first; ties go to the higher IoU, then the older track.
    #[default]
    Greedy,
    /// Globally optimal (Jonker-Volgenant).
    Optimal,
}

/// IoU similarity and `1 - IoU` cost between predicted boxes and detections.
#[derive(Debug, Clone)]
pub struct CostMatrix {
    pub cost: Array2<f32>,
    pub iou: Array2<f32>,
}

impl CostMatrix {
    pub fn iou_distance(track_boxes: &[Rect], det_boxes: &[Rect]) -> Self {
        let iou = iou_batch(track_boxes, det_boxes);
        let cost = iou.mapv(|s| 1.0 - s);
        Self { cost, iou }
    }

    /// Weight the similarity by detection confidence.
    pub fn fuse_score(&mut self, detections: &[Detection]) {
        let (rows, cols) = self.cost.dim();
        for i in 0..rows {
            for j in 0..cols {
                let fused_sim = self.iou[[i, j]] * detections[j].score;
                self.cost[[i, j]] = 1.0 - fused_sim;
            }
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        self.cost.dim()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentResult {
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

impl AssignmentResult {
    fn empty(num_rows: usize, num_cols: usize) -> Self {
        Self {
            matches: vec![],
            unmatched_tracks: (0..num_rows).collect(),
            unmatched_detections: (0..num_cols).collect(),
        }
    }

    fn from_matches(matches: Vec<(usize, usize)>, num_rows: usize, num_cols: usize) -> Self {
        let mut row_used = vec![false; num_rows];
        let mut col_used = vec![false; num_cols];
        for &(r, c) in &matches {
            row_used[r] = true;
            col_used[c] = true;
        }
        Self {
            matches,
            unmatched_tracks: (0..num_rows).filter(|&r| !row_used[r]).collect(),
            unmatched_detections: (0..num_cols).filter(|&c| !col_used[c]).collect(),
        }
    }
}

/// Assign rows (tracks) to columns (detections), rejecting pairs above `thresh`.
///
/// `track_ids[i]` is the ID of row `i`; lower IDs are older tracks.
pub fn assign(
    strategy: AssignmentStrategy,
    costs: &CostMatrix,
    track_ids: &[u64],
    thresh: f32,
) -> AssignmentResult {
    match strategy {
        AssignmentStrategy::Greedy => greedy_assignment(costs, track_ids, thresh),
        AssignmentStrategy::Optimal => linear_assignment(&costs.cost, thresh),
    }
}

pub fn greedy_assignment(costs: &CostMatrix, track_ids: &[u64], thresh: f32) -> AssignmentResult {
    let (num_rows, num_cols) = costs.dim();
    if num_rows == 0 || num_cols == 0 {
        return AssignmentResult::empty(num_rows, num_cols);
    }

    let mut candidates: Vec<(usize, usize)> = Vec::new();
    for i in 0..num_rows {
        for j in 0..num_cols {
            if costs.cost[[i, j]] <= thresh {
                candidates.push((i, j));
            }
        }
    }

    candidates.sort_by(|&(ia, ja), &(ib, jb)| {
        costs.cost[[ia, ja]]
            .total_cmp(&costs.cost[[ib, jb]])
            .then_with(|| costs.iou[[ib, jb]].total_cmp(&costs.iou[[ia, ja]]))
            .then_with(|| track_ids[ia].cmp(&track_ids[ib]))
            .then_with(|| ja.cmp(&jb))
    });

    let mut row_used = vec![false; num_rows];
    let mut col_used = vec![false; num_cols];
    let mut matches = Vec::new();
    for (i, j) in candidates {
        if row_used[i] || col_used[j] {
            continue;
        }
        row_used[i] = true;
        col_used[j] = true;
        matches.push((i, j));
    }
    matches.sort_by(|a, b| match a.0.cmp(&b.0) {
        Ordering::Equal => a.1.cmp(&b.1),
        other => other,
    });

    AssignmentResult::from_matches(matches, num_rows, num_cols)
}

pub fn linear_assignment(cost_matrix: &Array2<f32>, thresh: f32) -> AssignmentResult {
    let (num_rows, num_cols) = cost_matrix.dim();
    if num_rows == 0 || num_cols == 0 {
        return AssignmentResult::empty(num_rows, num_cols);
    }

    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::from_elem((size, size), 1e6);
    for i in 0..num_rows {
        for j in 0..num_cols {
            padded[[i, j]] = cost_matrix[[i, j]] as f64;
        }
    }

    let Ok((row_to_col, _)) = lapjv::lapjv(&padded) else {
        return AssignmentResult::empty(num_rows, num_cols);
    };

    let matches = row_to_col
        .iter()
        .enumerate()
        .take(num_rows)
        .filter(|&(row, &col)| col < num_cols && cost_matrix[[row, col]] <= thresh)
        .map(|(row, &col)| (row, col))
        .collect();

    AssignmentResult::from_matches(matches, num_rows, num_cols)
}
