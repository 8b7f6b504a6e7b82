mod matrix;
mod segment;

pub use matrix::Matrix4x3;
pub use segment::ParameterizedSegment;

use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

///Length in micrometres. All toolpath coordinates are fixed-point microns.
pub type Micron = i64;

///Conversion factor between microns and millimetres.
pub const MICRONS_PER_MM: f64 = 1000.0;

pub fn mm_to_micron(mm: f64) -> Micron {
    (mm * MICRONS_PER_MM).round() as Micron
}

pub fn micron_to_mm(micron: Micron) -> f64 {
    micron as f64 / MICRONS_PER_MM
}

///A 2D point in microns, used for all polygon and toolpath coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point2 {
    pub x: Micron,
    pub y: Micron,
}

impl Point2 {
    pub const fn new(x: Micron, y: Micron) -> Self {
        Self { x, y }
    }

    pub fn dot(self, other: Self) -> i64 {
        let dot = self.x as i128 * other.x as i128 + self.y as i128 * other.y as i128;
        dot.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    pub fn cross(self, other: Self) -> i64 {
        let cross = self.x as i128 * other.y as i128 - self.y as i128 * other.x as i128;
        cross.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    ///Squared length, saturating on overflow.
    pub fn vsize2(self) -> i64 {
        self.dot(self)
    }

    ///Rounded integer length.
    pub fn vsize(self) -> Micron {
        let x = self.x as f64;
        let y = self.y as f64;
        (x * x + y * y).sqrt().round() as Micron
    }

    pub fn turn_90_ccw(self) -> Self {
        Self::new(-self.y, self.x)
    }

    ///Rotate by an angle in radians, rounding to the nearest micron.
    pub fn rotate(self, angle: AngleRadians) -> Self {
        let (sin, cos) = angle.0.sin_cos();
        Self::new(
            (self.x as f64 * cos - self.y as f64 * sin).round() as Micron,
            (self.x as f64 * sin + self.y as f64 * cos).round() as Micron,
        )
    }

    pub fn to_mm(self) -> DVec2 {
        DVec2::new(micron_to_mm(self.x), micron_to_mm(self.y))
    }

    pub fn from_mm(mm: DVec2) -> Self {
        Self::new(mm_to_micron(mm.x), mm_to_micron(mm.y))
    }
}

impl Add for Point2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Point2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl AddAssign for Point2 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Point2 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul<i64> for Point2 {
    type Output = Self;
    fn mul(self, rhs: i64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Mul<f64> for Point2 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(
            (self.x as f64 * rhs).round() as Micron,
            (self.y as f64 * rhs).round() as Micron,
        )
    }
}

impl Div<i64> for Point2 {
    type Output = Self;
    fn div(self, rhs: i64) -> Self {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

///A 3D point in microns. Inside a move sequence the Z component is a
///relative offset that is added to the owning layer's Z on emission.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point3 {
    pub x: Micron,
    pub y: Micron,
    pub z: Micron,
}

impl Point3 {
    pub const fn new(x: Micron, y: Micron, z: Micron) -> Self {
        Self { x, y, z }
    }

    pub fn from_xy(p: Point2) -> Self {
        Self::new(p.x, p.y, 0)
    }

    pub fn xy(self) -> Point2 {
        Point2::new(self.x, self.y)
    }

    pub fn dot(self, other: Self) -> i64 {
        let dot = self.x as i128 * other.x as i128
            + self.y as i128 * other.y as i128
            + self.z as i128 * other.z as i128;
        dot.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    pub fn vsize2(self) -> i64 {
        self.dot(self)
    }

    pub fn vsize(self) -> Micron {
        let x = self.x as f64;
        let y = self.y as f64;
        let z = self.z as f64;
        (x * x + y * y + z * z).sqrt().round() as Micron
    }

    pub fn vsize_mm(self) -> f64 {
        micron_to_mm(self.vsize())
    }

    pub fn to_mm(self) -> DVec3 {
        DVec3::new(
            micron_to_mm(self.x),
            micron_to_mm(self.y),
            micron_to_mm(self.z),
        )
    }

    pub fn from_mm(mm: DVec3) -> Self {
        Self::new(mm_to_micron(mm.x), mm_to_micron(mm.y), mm_to_micron(mm.z))
    }
}

impl Add for Point3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<i64> for Point3 {
    type Output = Self;
    fn mul(self, rhs: i64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Mul<f64> for Point3 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(
            (self.x as f64 * rhs).round() as Micron,
            (self.y as f64 * rhs).round() as Micron,
            (self.z as f64 * rhs).round() as Micron,
        )
    }
}

impl Div<i64> for Point3 {
    type Output = Self;
    fn div(self, rhs: i64) -> Self {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

///An angle in radians.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct AngleRadians(pub f64);

///An angle in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct AngleDegrees(pub f64);

impl From<AngleDegrees> for AngleRadians {
    fn from(angle: AngleDegrees) -> Self {
        AngleRadians(angle.0.to_radians())
    }
}

impl From<AngleRadians> for AngleDegrees {
    fn from(angle: AngleRadians) -> Self {
        AngleDegrees(angle.0.to_degrees())
    }
}

///A dimensionless non-negative factor.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Ratio(pub f64);

impl Default for Ratio {
    fn default() -> Self {
        Ratio(1.0)
    }
}

///Speed in mm/s.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Velocity(pub f64);

///Acceleration in mm/s².
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Acceleration(pub f64);

///Instantaneous speed change in mm/s.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Jerk(pub f64);

///Time in seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Duration(pub f64);

impl Add for Duration {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Duration(self.0 + rhs.0)
    }
}

impl AddAssign for Duration {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Velocity {
    ///Time to travel the given distance (mm) at this speed.
    pub fn duration_for(self, distance_mm: f64) -> Duration {
        if self.0 <= f64::EPSILON {
            Duration(0.0)
        } else {
            Duration(distance_mm / self.0)
        }
    }
}

///Speed, acceleration and jerk bundled together, the way they travel
///through the plan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeedDerivatives {
    pub speed: Velocity,
    pub acceleration: Acceleration,
    pub jerk: Jerk,
}

impl SpeedDerivatives {
    ///Blend from `initial` towards self by `layer_nr / layer_count`.
    pub fn smoothed(self, initial: SpeedDerivatives, layer_nr: usize, layer_count: usize) -> Self {
        let t = layer_nr as f64 / layer_count as f64;
        Self {
            speed: Velocity(lerp(initial.speed.0, self.speed.0, t)),
            acceleration: Acceleration(lerp(initial.acceleration.0, self.acceleration.0, t)),
            jerk: Jerk(lerp(initial.jerk.0, self.jerk.0, t)),
        }
    }
}

pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + t * (b - a)
}

///Where `value` sits between `min` and `max`, unclamped.
pub fn inverse_lerp(min: f64, max: f64, value: f64) -> f64 {
    if (max - min).abs() <= f64::EPSILON {
        0.0
    } else {
        (value - min) / (max - min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_multiplication_rounds() {
        let p = Point2::new(10, 5);
        assert_eq!(p * 0.5, Point2::new(5, 3));
        assert_eq!(p * 0.49, Point2::new(5, 2));
    }

    #[test]
    fn division_truncates() {
        assert_eq!(Point2::new(7, -7) / 2, Point2::new(3, -3));
    }

    #[test]
    fn rotation_quarter_turn() {
        let p = Point2::new(1000, 0);
        let rotated = p.rotate(AngleRadians(std::f64::consts::FRAC_PI_2));
        assert_eq!(rotated, Point2::new(0, 1000));
    }

    #[test]
    fn vsize2_does_not_overflow() {
        let p = Point2::new(i64::MAX / 2, i64::MAX / 2);
        assert_eq!(p.vsize2(), i64::MAX);
    }

    #[test]
    fn mm_round_trip() {
        assert_eq!(mm_to_micron(1.2345), 1235);
        assert_eq!(micron_to_mm(1500), 1.5);
    }

    #[test]
    fn turn_90_is_exact() {
        assert_eq!(Point2::new(3, 4).turn_90_ccw(), Point2::new(-4, 3));
    }
}
