//! Closed-form hyperbolic multilateration over four anchors.
//!
//! Two pairs of range differences define two planes whose intersection is the
//! line `x = g·z + h`, `y = a·x + b·z + c`. Substituting the line into the
//! range equation of anchors 0 and 2 leaves a quadratic in `z`; both roots are
//! returned. Degenerate geometry is not guarded: zero denominators propagate
//! as non-finite coordinates.

use crate::prelude::{AnchorGeometry, LocalizerResult, ProcessingStage, NUM_ANCHORS};
use crate::tag_interface::PositionRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn to_f32(self) -> [f32; 3] {
        [self.x as f32, self.y as f32, self.z as f32]
    }

    pub fn distance_to(&self, point: [f64; 3]) -> f64 {
        ((self.x - point[0]).powi(2) + (self.y - point[1]).powi(2) + (self.z - point[2]).powi(2))
            .sqrt()
    }
}

/// Both roots of the quadratic in `z`. Which one is the tag is left to the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSolution {
    /// Root taken with `+sqrt(discriminant)`.
    pub first: Position,
    /// Root taken with `-sqrt(discriminant)`.
    pub second: Position,
    /// Reduced discriminant of the quadratic; negative or NaN means no real root.
    pub discriminant: f64,
}

impl PositionSolution {
    pub fn candidates(&self) -> [Position; 2] {
        [self.first, self.second]
    }

    pub fn is_finite(&self) -> bool {
        self.first.is_finite() && self.second.is_finite()
    }

    pub fn to_record(&self, group_id: i32) -> PositionRecord {
        PositionRecord::new(group_id, self.first.to_f32(), self.second.to_f32())
    }
}

/// Absolute range differences of the four anchor pairs used by the solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeDifferences {
    pub r01: f64,
    pub r02: f64,
    pub r21: f64,
    pub r23: f64,
}

impl RangeDifferences {
    pub fn from_distances(distances: &[f64; NUM_ANCHORS]) -> Self {
        Self {
            r01: (distances[0] - distances[1]).abs(),
            r02: (distances[0] - distances[2]).abs(),
            r21: (distances[2] - distances[1]).abs(),
            r23: (distances[2] - distances[3]).abs(),
        }
    }
}

pub struct TdoaSolver {
    anchors: AnchorGeometry,
}

impl TdoaSolver {
    pub fn new(anchors: AnchorGeometry) -> Self {
        Self { anchors }
    }

    pub fn solve(&self, distances: &[f64; NUM_ANCHORS]) -> PositionSolution {
        self.solve_differences(&RangeDifferences::from_distances(distances))
    }

    pub fn solve_differences(&self, ranges: &RangeDifferences) -> PositionSolution {
        let anchors = &self.anchors;
        let (x0, y0, z0) = (anchors.x(0), anchors.y(0), anchors.z(0));
        let dx = |to: usize, from: usize| anchors.x(to) - anchors.x(from);
        let dy = |to: usize, from: usize| anchors.y(to) - anchors.y(from);
        let dz = |to: usize, from: usize| anchors.z(to) - anchors.z(from);
        // |A_from|² - |A_to|²
        let dn = |from: usize, to: usize| anchors.norm_sq(from) - anchors.norm_sq(to);

        let RangeDifferences { r01, r02, r21, r23 } = *ranges;

        // Plane from pairs (0,1) and (0,2): p1·x + u1·z + w1 = q1·y
        let p1 = r02 * dx(1, 0) - r01 * dx(2, 0);
        let q1 = r01 * dy(2, 0) - r02 * dy(1, 0);
        let u1 = r02 * dz(1, 0) - r01 * dz(2, 0);
        let w1 = (r02 * (r01 * r01 + dn(0, 1)) - r01 * (r02 * r02 + dn(0, 2))) / 2.0;

        // Plane from pairs (2,1) and (2,3)
        let p2 = r23 * dx(1, 2) - r21 * dx(3, 2);
        let q2 = r21 * dy(3, 2) - r23 * dy(1, 2);
        let u2 = r23 * dz(1, 2) - r21 * dz(3, 2);
        let w2 = (r23 * (r21 * r21 + dn(2, 1)) - r21 * (r23 * r23 + dn(2, 3))) / 2.0;

        // y = a·x + b·z + c on both planes
        let (a, b, c) = (p1 / q1, u1 / q1, w1 / q1);
        let (d, e, f) = (p2 / q2, u2 / q2, w2 / q2);

        // Intersection line: x = g·z + h, y = i·z + j
        let g = (e - b) / (a - d);
        let h = (f - c) / (a - d);
        let i = a * g + b;
        let j = a * h + c;

        // Range equation of anchors 0 and 2 along the line
        let k = r02 * r02 + dn(0, 2) + 2.0 * h * dx(2, 0) + 2.0 * j * dy(2, 0);
        let l = 2.0 * (g * dx(2, 0) + i * dy(2, 0) + dz(2, 0));
        let r02_sq4 = 4.0 * r02 * r02;
        let m = r02_sq4 * (g * g + i * i + 1.0) - l * l;
        let n = 2.0 * r02_sq4 * (g * (x0 - h) + i * (y0 - j) + z0) + 2.0 * l * k;
        let o = r02_sq4 * ((x0 - h).powi(2) + (y0 - j).powi(2) + z0 * z0) - k * k;

        let half_b = n / (2.0 * m);
        let discriminant = half_b * half_b - o / m;
        let root = discriminant.sqrt();

        let point = |z: f64| {
            let x = g * z + h;
            Position {
                x,
                y: a * x + b * z + c,
                z,
            }
        };

        PositionSolution {
            first: point(half_b + root),
            second: point(half_b - root),
            discriminant,
        }
    }
}

impl ProcessingStage for TdoaSolver {
    type Input<'a> = &'a [f64; NUM_ANCHORS];
    type Output = PositionSolution;

    fn name(&self) -> &'static str {
        "tdoa-solve"
    }

    fn execute(&mut self, input: Self::Input<'_>) -> LocalizerResult<PositionSolution> {
        Ok(self.solve(input))
    }
}
