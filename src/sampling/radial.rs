//! Radial trajectories and density compensation
//!
//! Sample `s = r + spoke*n_read` sits at radius -0.5 + r/n_read along the
//! spoke direction (cos a, sin a), in cycles/pixel.

use std::f64::consts::PI;

use super::frame_ranges;
use crate::acquisition::{SamplingMask, Trajectory};
use crate::error::{check_len, ReconError, Result};

/// Golden-angle increment in degrees
pub const GOLDEN_ANGLE_DEG: f64 = 180.0 * 0.618034;

/// Tiny golden-angle increment in degrees
pub const TINY_GOLDEN_ANGLE_DEG: f64 = 180.0 * 0.1312674636;

/// Angular ordering of successive spokes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpokeOrdering {
    /// Increment by 111.246 degrees
    GoldenAngle,
    /// Increment by 23.628 degrees
    TinyGoldenAngle,
    /// Equidistant over 180 degrees, odd spokes read out in reverse
    Linear,
}

/// Spoke angles in radians
pub fn spoke_angles(n_spokes: usize, ordering: SpokeOrdering, start_angle_deg: f64) -> Vec<f64> {
    let step = match ordering {
        SpokeOrdering::GoldenAngle => GOLDEN_ANGLE_DEG.to_radians(),
        SpokeOrdering::TinyGoldenAngle => TINY_GOLDEN_ANGLE_DEG.to_radians(),
        SpokeOrdering::Linear => PI / n_spokes.max(1) as f64,
    };
    let start = start_angle_deg.to_radians();
    (0..n_spokes).map(|i| start + i as f64 * step).collect()
}

/// Spokes needed for Nyquist sampling of `n_read` readout points,
/// divided by `acceleration` when it exceeds 1
pub fn nyquist_spokes(n_read: usize, acceleration: f64) -> usize {
    let nyquist = (PI / 2.0 * n_read as f64).round();
    let n = if acceleration > 1.0 { (nyquist / acceleration).round() } else { nyquist };
    (n as usize).max(1)
}

/// Radial trajectory of `n_spokes` spokes with `n_read` points each
pub fn radial_trajectory(
    n_read: usize,
    n_spokes: usize,
    ordering: SpokeOrdering,
    start_angle_deg: f64,
) -> Result<Trajectory> {
    if n_read == 0 || n_spokes == 0 {
        return Err(ReconError::invalid(format!(
            "radial trajectory needs readout points and spokes, got {}x{}",
            n_read, n_spokes
        )));
    }

    let n = n_read * n_spokes;
    let mut coords = vec![0.0; 2 * n];
    for (spoke, angle) in spoke_angles(n_spokes, ordering, start_angle_deg).into_iter().enumerate() {
        let reversed = ordering == SpokeOrdering::Linear && spoke % 2 == 1;
        let sign = if reversed { -1.0 } else { 1.0 };
        let (sin, cos) = angle.sin_cos();
        for r in 0..n_read {
            let k = sign * (-0.5 + r as f64 / n_read as f64);
            let s = r + spoke * n_read;
            coords[s] = k * cos;
            coords[s + n] = k * sin;
        }
    }
    Trajectory::new(coords, n)
}

/// Density compensation of a radial trajectory
///
/// Each sample gets a |k| ramp along its spoke, weighted by half the
/// angular gap to the neighbouring spokes over pi. Spoke angles are taken
/// from the first readout point. The result is normalized to a maximum of 1.
pub fn radial_dcf(trajectory: &Trajectory, n_read: usize, n_spokes: usize) -> Result<Vec<f64>> {
    check_len("radial trajectory", n_read * n_spokes, trajectory.len())?;
    if n_read == 0 || n_spokes == 0 {
        return Err(ReconError::invalid("radial density compensation needs a non-empty trajectory"));
    }

    let angles: Vec<f64> = (0..n_spokes)
        .map(|spoke| {
            let s = spoke * n_read;
            trajectory.ky(s).atan2(trajectory.kx(s)).to_degrees() + 180.0
        })
        .collect();

    let mut order: Vec<usize> = (0..n_spokes).collect();
    order.sort_by(|&a, &b| angles[a].total_cmp(&angles[b]));

    let mut spoke_weight = vec![0.0; n_spokes];
    for (rank, &spoke) in order.iter().enumerate() {
        let a = angles[spoke];
        let prev = if rank == 0 { angles[order[n_spokes - 1]] - 360.0 } else { angles[order[rank - 1]] };
        let next = if rank == n_spokes - 1 { angles[order[0]] + 360.0 } else { angles[order[rank + 1]] };
        let gap = 0.5 * ((next - a).abs() + (prev - a).abs()).to_radians();
        spoke_weight[spoke] = 0.5 * gap / PI;
    }

    let ramp: Vec<f64> = (0..n_read)
        .map(|r| {
            if n_read == 1 {
                0.5
            } else {
                (-0.5 + r as f64 / (n_read - 1) as f64).abs()
            }
        })
        .collect();

    let scale = n_read as f64 * PI;
    let mut dcf: Vec<f64> = (0..n_read * n_spokes)
        .map(|s| ramp[s % n_read] * spoke_weight[s / n_read] * scale)
        .collect();

    let max = dcf.iter().copied().fold(0.0, f64::max);
    if max > 0.0 {
        for w in &mut dcf {
            *w /= max;
        }
    }
    Ok(dcf)
}

/// Golden-angle trajectory and its density compensation for an
/// acceleration relative to Nyquist sampling
pub fn golden_angle_radial(n_read: usize, acceleration: f64) -> Result<(Trajectory, Vec<f64>)> {
    let n_spokes = nyquist_spokes(n_read, acceleration);
    let trajectory = radial_trajectory(n_read, n_spokes, SpokeOrdering::GoldenAngle, 0.0)?;
    let dcf = radial_dcf(&trajectory, n_read, n_spokes)?;
    Ok((trajectory, dcf))
}

/// Per-frame sample masks giving each time frame a contiguous block of spokes
pub fn spoke_masks(n_read: usize, n_spokes: usize, n_frames: usize) -> Result<Vec<SamplingMask>> {
    Ok(frame_ranges(n_spokes, n_frames)?
        .into_iter()
        .map(|spokes| {
            let sampled: Vec<bool> = (0..n_read * n_spokes)
                .map(|s| spokes.contains(&(s / n_read)))
                .collect();
            SamplingMask::from_bools(&sampled)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nyquist_spokes() {
        assert_eq!(nyquist_spokes(64, 1.0), 101);
        assert_eq!(nyquist_spokes(64, 4.0), 25);
        assert_eq!(nyquist_spokes(2, 100.0), 1);
    }

    #[test]
    fn test_golden_angle_spokes() {
        let traj = radial_trajectory(8, 3, SpokeOrdering::GoldenAngle, 0.0).unwrap();
        assert_eq!(traj.len(), 24);
        // First spoke lies on the kx axis, starting at -0.5
        assert!((traj.kx(0) + 0.5).abs() < 1e-15);
        assert!(traj.ky(0).abs() < 1e-15);
        // Second spoke is rotated by the golden angle
        let a = traj.ky(8).atan2(traj.kx(8)) + PI;
        assert!((a - GOLDEN_ANGLE_DEG.to_radians()).abs() < 1e-12, "angle {}", a.to_degrees());
        assert!(traj.as_slice().iter().all(|k| k.abs() <= 0.5));
    }

    #[test]
    fn test_linear_ordering_alternates() {
        let traj = radial_trajectory(4, 2, SpokeOrdering::Linear, 0.0).unwrap();
        // Spoke 0 along +kx from -0.5, spoke 1 at 90 degrees read out in reverse
        assert!((traj.kx(0) + 0.5).abs() < 1e-15);
        assert!((traj.ky(4) - 0.5).abs() < 1e-15);
        assert!((traj.ky(5) - 0.25).abs() < 1e-15);
    }

    #[test]
    fn test_single_spoke_dcf_is_ramp() {
        let traj = radial_trajectory(5, 1, SpokeOrdering::GoldenAngle, 0.0).unwrap();
        let dcf = radial_dcf(&traj, 5, 1).unwrap();
        let expected = [1.0, 0.5, 0.0, 0.5, 1.0];
        for (d, e) in dcf.iter().zip(expected.iter()) {
            assert!((d - e).abs() < 1e-12, "{:?}", dcf);
        }
    }

    #[test]
    fn test_golden_angle_dcf_normalized() {
        let (traj, dcf) = golden_angle_radial(16, 4.0).unwrap();
        assert_eq!(dcf.len(), traj.len());
        let max = dcf.iter().copied().fold(0.0, f64::max);
        assert!((max - 1.0).abs() < 1e-12);
        assert!(dcf.iter().all(|&w| w >= 0.0));
        // Edge of each spoke weighs more than its centre
        assert!(dcf[0] > dcf[8]);
    }

    #[test]
    fn test_dcf_rejects_wrong_shape() {
        let traj = radial_trajectory(4, 2, SpokeOrdering::Linear, 0.0).unwrap();
        assert!(radial_dcf(&traj, 4, 3).is_err());
    }

    #[test]
    fn test_spoke_masks() {
        let masks = spoke_masks(3, 4, 2).unwrap();
        assert_eq!(masks.len(), 2);
        assert_eq!(masks[0].weights(), &[1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(masks[1].sampled_count(), 6);
    }
}
