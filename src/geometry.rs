//! Geometry kernel: vectors, angles and the scaffolding primitives.
//!
//! All angles are radians. Degrees only show up at the presentation
//! boundary through [`deg_to_rad`] / [`rad_to_deg`].

use std::f64::consts::PI;
use std::ops::{Add, Sub};

use serde::Serialize;

/// Tolerance used for every "did this change" check.
pub const EPS: f64 = 1e-7;

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPS
}

pub fn deg_to_rad(deg: f64) -> f64 {
    deg / 360.0 * 2.0 * PI
}

pub fn rad_to_deg(rad: f64) -> f64 {
    rad / 2.0 / PI * 360.0
}

/// Normalize an angle into `[0, 2π)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let full = 2.0 * PI;
    let a = angle % full;
    let a = if a < 0.0 { a + full } else { a };
    // `-tiny % 2π + 2π` rounds up to exactly 2π.
    if a >= full { 0.0 } else { a }
}

/// Angle subtended by an arc of `segment_length` on a circle of radius `r`.
///
/// A ring of (near) zero radius has no circumference to measure against and
/// yields 0.
pub fn segment_length_to_rad(r: f64, segment_length: f64) -> f64 {
    if r.abs() < EPS {
        return 0.0;
    }
    segment_length / r
}

/// Arc length covered by `angle` on a circle of radius `r`.
pub fn rad_to_segment_length(r: f64, angle: f64) -> f64 {
    angle * r
}

/// Linear interpolation between `a` and `b`.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn from_radial(r: f64, angle: f64) -> Self {
        Self { x: r * angle.cos(), y: r * angle.sin() }
    }

    pub fn scale(self, k: f64) -> Vec2 {
        Vec2 { x: self.x * k, y: self.y * k }
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Direction from `other` towards `self`.
    pub fn angle_to(self, other: Vec2) -> f64 {
        (self.y - other.y).atan2(self.x - other.x)
    }

    pub fn approx_eq(self, other: Vec2) -> bool {
        approx_eq(self.x, other.x) && approx_eq(self.y, other.y)
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, other: Vec2) -> Vec2 {
        Vec2 { x: self.x + other.x, y: self.y + other.y }
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, other: Vec2) -> Vec2 {
        Vec2 { x: self.x - other.x, y: self.y - other.y }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Line {
    pub from: Vec2,
    pub to: Vec2,
}

/// Circular arc around `center`, swept from `from_angle` to `to_angle`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Arc {
    pub center: Vec2,
    pub r: f64,
    pub from_angle: f64,
    pub to_angle: f64,
}

impl Arc {
    pub fn from(&self) -> Vec2 {
        self.center + Vec2::from_radial(self.r, self.from_angle)
    }

    pub fn to(&self) -> Vec2 {
        self.center + Vec2::from_radial(self.r, self.to_angle)
    }

    pub fn sweep(&self) -> f64 {
        self.to_angle - self.from_angle
    }
}

/// Quadratic bezier with a single control point.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Bezier {
    pub from: Vec2,
    pub to: Vec2,
    pub cp: Vec2,
}

/// One piece of scaffolding. Renderers switch on the variant.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Line(Line),
    Arc(Arc),
    Bezier(Bezier),
}

impl Shape {
    pub fn line(from: Vec2, to: Vec2) -> Shape {
        Shape::Line(Line { from, to })
    }

    pub fn arc(center: Vec2, r: f64, from_angle: f64, to_angle: f64) -> Shape {
        Shape::Arc(Arc { center, r, from_angle, to_angle })
    }

    pub fn bezier(from: Vec2, to: Vec2, cp: Vec2) -> Shape {
        Shape::Bezier(Bezier { from, to, cp })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn center(&self) -> Vec2 {
        Vec2 { x: self.x + self.width / 2.0, y: self.y + self.height / 2.0 }
    }

    /// Smallest rect containing every point, or the zero rect for none.
    pub fn enclosing(points: impl IntoIterator<Item = Vec2>) -> Rect {
        let mut any = false;
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in points {
            any = true;
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        if !any {
            return Rect::default();
        }
        Rect { x: min_x, y: min_y, width: max_x - min_x, height: max_y - min_y }
    }
}
