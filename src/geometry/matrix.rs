use glam::DVec3;

use super::{mm_to_micron, Micron, Point3, Ratio};

///A 4x3 affine transformation matrix. Behaves like a 4x4 matrix whose
///bottom row is always identity. The first index is the column, the second
///the row.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix4x3 {
    pub m: [[f64; 3]; 4],
}

impl Default for Matrix4x3 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix4x3 {
    pub fn identity() -> Self {
        Self {
            m: [
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
                [0.0, 0.0, 0.0],
            ],
        }
    }

    ///A uniform scale away from the given origin. Shrinking pulls all
    ///coordinates towards the origin, growing pushes them away.
    pub fn scale_about(scale: Ratio, origin: Point3) -> Self {
        Self::scale_about_xyz(scale, scale, scale, origin)
    }

    pub fn scale_about_xyz(scale_x: Ratio, scale_y: Ratio, scale_z: Ratio, origin: Point3) -> Self {
        let mut result = Self::identity();
        result.m[0][0] = scale_x.0;
        result.m[1][1] = scale_y.0;
        result.m[2][2] = scale_z.0;

        // translate(-origin), scale, translate(origin) composed into one.
        result.m[3][0] = (scale_x.0 - 1.0) * -(origin.x as f64);
        result.m[3][1] = (scale_y.0 - 1.0) * -(origin.y as f64);
        result.m[3][2] = (scale_z.0 - 1.0) * -(origin.z as f64);

        result
    }

    ///Apply to a millimetre coordinate, rounding into microns.
    pub fn apply_mm(&self, p: DVec3) -> Point3 {
        Point3::new(
            mm_to_micron(p.x * self.m[0][0] + p.y * self.m[1][0] + p.z * self.m[2][0])
                + self.m[3][0].round() as Micron,
            mm_to_micron(p.x * self.m[0][1] + p.y * self.m[1][1] + p.z * self.m[2][1])
                + self.m[3][1].round() as Micron,
            mm_to_micron(p.x * self.m[0][2] + p.y * self.m[1][2] + p.z * self.m[2][2])
                + self.m[3][2].round() as Micron,
        )
    }

    pub fn apply(&self, p: Point3) -> Point3 {
        let x = p.x as f64;
        let y = p.y as f64;
        let z = p.z as f64;
        Point3::new(
            (x * self.m[0][0] + y * self.m[1][0] + z * self.m[2][0] + self.m[3][0]).round()
                as Micron,
            (x * self.m[0][1] + y * self.m[1][1] + z * self.m[2][1] + self.m[3][1]).round()
                as Micron,
            (x * self.m[0][2] + y * self.m[1][2] + z * self.m[2][2] + self.m[3][2]).round()
                as Micron,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_noop() {
        let p = Point3::new(1000, -2000, 3000);
        assert_eq!(Matrix4x3::identity().apply(p), p);
    }

    #[test]
    fn scale_about_origin_keeps_origin_fixed() {
        let origin = Point3::new(10_000, 10_000, 0);
        let matrix = Matrix4x3::scale_about(Ratio(2.0), origin);
        assert_eq!(matrix.apply(origin), origin);
        assert_eq!(
            matrix.apply(Point3::new(11_000, 10_000, 0)),
            Point3::new(12_000, 10_000, 0)
        );
    }
}
