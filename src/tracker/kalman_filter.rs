//! Constant-velocity Kalman filter over bounding boxes in XYAH space.
//!
//! The 8-dimensional state is `(cx, cy, a, h, vcx, vcy, va, vh)`; only the
//! first four components are observed. Noise scales with box height so far
//! (small) and near (large) vessels get comparable relative uncertainty.

use ndarray::{Array1, Array2};

use crate::tracker::rect::Rect;

const NDIM: usize = 4;

/// Mean and covariance of one track's motion state.
#[derive(Debug, Clone)]
pub struct MotionState {
    pub mean: Array1<f64>,
    pub covariance: Array2<f64>,
}

impl MotionState {
    /// Box implied by the current mean.
    pub fn rect(&self) -> Rect {
        Rect::from_xyah(
            self.mean[0] as f32,
            self.mean[1] as f32,
            self.mean[2] as f32,
            self.mean[3] as f32,
        )
    }

    /// Centre velocity in pixels per frame.
    pub fn velocity(&self) -> (f32, f32) {
        (self.mean[NDIM] as f32, self.mean[NDIM + 1] as f32)
    }
}

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    motion_mat: Array2<f64>,
    update_mat: Array2<f64>,
    std_weight_position: f64,
    std_weight_velocity: f64,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl KalmanFilter {
    pub fn new() -> Self {
        let mut motion_mat = Array2::eye(2 * NDIM);
        for i in 0..NDIM {
            motion_mat[[i, NDIM + i]] = 1.0;
        }

        let mut update_mat = Array2::zeros((NDIM, 2 * NDIM));
        for i in 0..NDIM {
            update_mat[[i, i]] = 1.0;
        }

        Self {
            motion_mat,
            update_mat,
            std_weight_position: 1.0 / 20.0,
            std_weight_velocity: 1.0 / 160.0,
        }
    }

    pub fn initiate(&self, rect: &Rect) -> MotionState {
        let measurement = xyah_f64(rect);
        let mut mean = Array1::zeros(2 * NDIM);
        for i in 0..NDIM {
            mean[i] = measurement[i];
        }

        let h = measurement[3];
        let pos = 2.0 * self.std_weight_position * h;
        let vel = 10.0 * self.std_weight_velocity * h;
        let covariance = diagonal(&[pos, pos, 1e-2, pos, vel, vel, 1e-5, vel]);

        MotionState { mean, covariance }
    }

    /// Advance the state by one frame.
    ///
    /// `freeze_height` zeroes the height velocity first; occluded tracks use it
    /// so a box seen shrinking into an occluder does not keep collapsing.
    pub fn predict(&self, state: &MotionState, freeze_height: bool) -> MotionState {
        let mut mean = state.mean.clone();
        if freeze_height {
            mean[7] = 0.0;
        }

        let h = mean[3];
        let pos = self.std_weight_position * h;
        let vel = self.std_weight_velocity * h;
        let motion_cov = diagonal(&[pos, pos, 1e-2, pos, vel, vel, 1e-5, vel]);

        MotionState {
            mean: self.motion_mat.dot(&mean),
            covariance: self
                .motion_mat
                .dot(&state.covariance)
                .dot(&self.motion_mat.t())
                + motion_cov,
        }
    }

    fn project(&self, state: &MotionState) -> (Array1<f64>, Array2<f64>) {
        let h = state.mean[3];
        let pos = self.std_weight_position * h;
        let innovation_cov = diagonal(&[pos, pos, 1e-1, pos]);

        let mean = self.update_mat.dot(&state.mean);
        let covariance = self
            .update_mat
            .dot(&state.covariance)
            .dot(&self.update_mat.t())
            + innovation_cov;
        (mean, covariance)
    }

    /// Correct the state with an observed box.
    ///
    /// Returns `None` when the innovation covariance is singular, which only
    /// happens for degenerate (zero-height) boxes; callers re-initiate.
    pub fn update(&self, state: &MotionState, observed: &Rect) -> Option<MotionState> {
        let (projected_mean, projected_cov) = self.project(state);
        let innovation = Array1::from_vec(xyah_f64(observed).to_vec()) - projected_mean;

        let s_inv = invert_4x4(&projected_cov)?;
        // H = [I 0], so P * H^T is the first four columns of P.
        let pht = state.covariance.dot(&self.update_mat.t());
        let gain = pht.dot(&s_inv);

        Some(MotionState {
            mean: &state.mean + &gain.dot(&innovation),
            covariance: &state.covariance - &gain.dot(&projected_cov).dot(&gain.t()),
        })
    }
}

fn xyah_f64(rect: &Rect) -> [f64; 4] {
    let [cx, cy, a, h] = rect.to_xyah();
    [cx as f64, cy as f64, a as f64, h as f64]
}

fn diagonal(std: &[f64]) -> Array2<f64> {
    let mut m = Array2::zeros((std.len(), std.len()));
    for (i, s) in std.iter().enumerate() {
        m[[i, i]] = s * s;
    }
    m
}

fn invert_4x4(m: &Array2<f64>) -> Option<Array2<f64>> {
    let nm = nalgebra::Matrix4::from_fn(|i, j| m[[i, j]]);
    let inv = nm.try_inverse()?;
    Some(Array2::from_shape_fn((NDIM, NDIM), |(i, j)| inv[(i, j)]))
}
