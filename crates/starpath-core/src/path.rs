//! Closed Catmull-Rom tour path.
//!
//! Control points are the waypoint centers with the first center appended
//! again, evaluated as a closed curve. Queries take a normalized arc-length
//! parameter `t`, so equal steps of `t` cover equal distances.

use glam::Vec3;

use crate::error::SceneError;

pub const PATH_TENSION: f32 = 0.5;

/// Samples used for the arc-length table.
const ARC_DIVISIONS: usize = 200;

/// Step used for finite-difference tangents, in raw curve parameter.
const TANGENT_DELTA: f32 = 1e-4;

#[derive(Debug, Clone)]
pub struct PathCurve {
    points: Vec<Vec3>,
    tension: f32,
    /// Cumulative length at raw parameter `k / ARC_DIVISIONS`.
    arc_lengths: Vec<f32>,
}

impl PathCurve {
    /// Build the closed loop through `centers`.
    pub fn through(centers: &[Vec3]) -> Result<Self, SceneError> {
        if centers.len() < 2 {
            return Err(SceneError::TooFewWaypoints(centers.len()));
        }
        let mut points = centers.to_vec();
        points.push(centers[0]);

        let mut curve = Self {
            points,
            tension: PATH_TENSION,
            arc_lengths: Vec::with_capacity(ARC_DIVISIONS + 1),
        };
        curve.arc_lengths = curve.compute_arc_lengths();
        Ok(curve)
    }

    pub fn length(&self) -> f32 {
        self.arc_lengths.last().copied().unwrap_or(0.0)
    }

    /// Position at normalized parameter `t`; wraps modulo 1.
    pub fn position_at(&self, t: f32) -> Vec3 {
        self.point(self.raw_param(wrap_unit(t)))
    }

    /// Unit tangent at normalized parameter `t`; wraps modulo 1.
    pub fn tangent_at(&self, t: f32) -> Vec3 {
        let u = self.raw_param(wrap_unit(t));
        let a = self.point(wrap_unit(u - TANGENT_DELTA));
        let b = self.point(wrap_unit(u + TANGENT_DELTA));
        let tangent = (b - a).normalize_or_zero();
        if tangent != Vec3::ZERO {
            return tangent;
        }
        // Degenerate spot: fall back to the chord of the current segment.
        let n = self.points.len();
        let seg = ((u * n as f32).floor() as usize) % n;
        (self.points[(seg + 1) % n] - self.points[seg]).normalize_or_zero()
    }

    /// Point at raw curve parameter `u` in [0, 1).
    fn point(&self, u: f32) -> Vec3 {
        let n = self.points.len();
        let scaled = u * n as f32;
        let seg = scaled.floor();
        let weight = scaled - seg;
        let i = (seg as usize) % n;

        catmull_rom(
            self.points[(i + n - 1) % n],
            self.points[i],
            self.points[(i + 1) % n],
            self.points[(i + 2) % n],
            weight,
            self.tension,
        )
    }

    fn compute_arc_lengths(&self) -> Vec<f32> {
        let mut lengths = Vec::with_capacity(ARC_DIVISIONS + 1);
        let mut total = 0.0;
        let mut prev = self.point(0.0);
        lengths.push(0.0);
        for k in 1..=ARC_DIVISIONS {
            let u = k as f32 / ARC_DIVISIONS as f32;
            let p = if k == ARC_DIVISIONS { self.point(0.0) } else { self.point(u) };
            total += p.distance(prev);
            lengths.push(total);
            prev = p;
        }
        lengths
    }

    /// Map normalized arc length `t` to the raw curve parameter.
    fn raw_param(&self, t: f32) -> f32 {
        let total = self.length();
        if total <= 0.0 {
            return t;
        }
        let target = t * total;
        // First sample whose cumulative length reaches the target.
        let hi = self
            .arc_lengths
            .partition_point(|&len| len < target)
            .clamp(1, ARC_DIVISIONS);
        let lo = hi - 1;
        let before = self.arc_lengths[lo];
        let span = self.arc_lengths[hi] - before;
        let frac = if span > 0.0 { (target - before) / span } else { 0.0 };
        (lo as f32 + frac) / ARC_DIVISIONS as f32
    }
}

/// Wrap into [0, 1). `wrap_unit(1.0) == 0.0`.
pub fn wrap_unit(t: f32) -> f32 {
    let w = t.rem_euclid(1.0);
    if w >= 1.0 {
        0.0
    } else {
        w
    }
}

fn catmull_rom(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32, tension: f32) -> Vec3 {
    // Cubic Hermite form.
    let v0 = (p2 - p0) * tension;
    let v1 = (p3 - p1) * tension;

    let t2 = t * t;
    let t3 = t2 * t;

    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;

    p1 * h00 + v0 * h10 + p2 * h01 + v1 * h11
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring() -> Vec<Vec3> {
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(80.0, 20.0, 30.0),
            Vec3::new(120.0, 40.0, -40.0),
            Vec3::new(180.0, 10.0, -20.0),
            Vec3::new(240.0, -20.0, 60.0),
            Vec3::new(320.0, 0.0, 40.0),
            Vec3::new(400.0, 30.0, -50.0),
            Vec3::new(480.0, -10.0, -20.0),
        ]
    }

    #[test]
    fn test_rejects_single_point() {
        assert!(PathCurve::through(&[Vec3::ZERO]).is_err());
    }

    #[test]
    fn test_starts_and_ends_at_first_waypoint() {
        let curve = PathCurve::through(&ring()).unwrap();
        assert!(curve.position_at(0.0).distance(Vec3::ZERO) < 1e-4);
        assert!(curve.position_at(1.0).distance(Vec3::ZERO) < 1e-4);
        assert!(curve.position_at(1.0 - 1e-4).distance(Vec3::ZERO) < 1.0);
    }

    #[test]
    fn test_parameter_wraps() {
        let curve = PathCurve::through(&ring()).unwrap();
        for &t in &[0.1f32, 0.37, 0.5, 0.83] {
            let base = curve.position_at(t);
            assert!(curve.position_at(t + 1.0).distance(base) < 0.05, "t={}", t);
            assert!(curve.position_at(t - 1.0).distance(base) < 0.05, "t={}", t);
            assert!(curve.position_at(t + 3.0).distance(base) < 0.05, "t={}", t);
        }
    }

    #[test]
    fn test_passes_through_control_points() {
        let pts = ring();
        let curve = PathCurve::through(&pts).unwrap();
        // Densely sample and make sure every waypoint is hit.
        for p in &pts {
            let closest = (0..4000)
                .map(|i| curve.position_at(i as f32 / 4000.0).distance(*p))
                .fold(f32::INFINITY, f32::min);
            assert!(closest < 1.0, "missed {:?} by {}", p, closest);
        }
    }

    #[test]
    fn test_tangents_are_unit_length() {
        let curve = PathCurve::through(&ring()).unwrap();
        for i in 0..50 {
            let tan = curve.tangent_at(i as f32 / 50.0);
            assert!((tan.length() - 1.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_arc_length_parameterization_is_even() {
        let curve = PathCurve::through(&ring()).unwrap();
        let step = curve.length() / 100.0;
        for i in 5..80 {
            let a = curve.position_at(i as f32 / 100.0);
            let b = curve.position_at((i + 1) as f32 / 100.0);
            // Chord is never longer than the arc, and not much shorter on a smooth curve.
            let chord = a.distance(b);
            assert!(chord <= step * 1.05, "segment {} chord {} step {}", i, chord, step);
            assert!(chord >= step * 0.6, "segment {} chord {} step {}", i, chord, step);
        }
    }

    #[test]
    fn test_wrap_unit() {
        assert_eq!(wrap_unit(1.0), 0.0);
        assert!((wrap_unit(-0.25) - 0.75).abs() < 1e-6);
        assert!((wrap_unit(2.5) - 0.5).abs() < 1e-6);
    }
}
