use glam::DVec3;

///A 3D segment parameterized for quick clipping against X and Y slabs,
///used by the voxel rasterisation.
#[derive(Clone, Copy, Debug)]
pub struct ParameterizedSegment {
    direction: DVec3,
    start: DVec3,
    end: DVec3,
}

impl ParameterizedSegment {
    pub fn new(start: DVec3, end: DVec3) -> Self {
        Self {
            direction: end - start,
            start,
            end,
        }
    }

    pub fn start(&self) -> DVec3 {
        self.start
    }

    pub fn end(&self) -> DVec3 {
        self.end
    }

    fn point_at_x(&self, x: f64) -> DVec3 {
        let factor = (x - self.start.x) / self.direction.x;
        DVec3::new(
            x,
            self.start.y + factor * self.direction.y,
            self.start.z + factor * self.direction.z,
        )
    }

    fn point_at_y(&self, y: f64) -> DVec3 {
        let factor = (y - self.start.y) / self.direction.y;
        DVec3::new(
            self.start.x + factor * self.direction.x,
            y,
            self.start.z + factor * self.direction.z,
        )
    }

    fn cropped_x(&self, slab_start: f64, slab_end: f64, p1: DVec3, p2: DVec3) -> Option<Self> {
        if p1.x <= slab_end && p2.x >= slab_start {
            Some(Self::new(
                if p1.x < slab_start {
                    self.point_at_x(slab_start)
                } else {
                    p1
                },
                if p2.x > slab_end {
                    self.point_at_x(slab_end)
                } else {
                    p2
                },
            ))
        } else {
            None
        }
    }

    ///The part of this segment lying inside the X slab, if any.
    pub fn intersection_with_x_slab(&self, slab_start: f64, slab_end: f64) -> Option<Self> {
        if self.direction.x > 0.0 {
            self.cropped_x(slab_start, slab_end, self.start, self.end)
        } else if self.direction.x < 0.0 {
            self.cropped_x(slab_start, slab_end, self.end, self.start)
        } else if self.start.x >= slab_start && self.start.x <= slab_end {
            Some(*self)
        } else {
            None
        }
    }

    fn cropped_y(&self, slab_start: f64, slab_end: f64, p1: DVec3, p2: DVec3) -> Option<Self> {
        if p1.y <= slab_end && p2.y >= slab_start {
            Some(Self::new(
                if p1.y < slab_start {
                    self.point_at_y(slab_start)
                } else {
                    p1
                },
                if p2.y > slab_end {
                    self.point_at_y(slab_end)
                } else {
                    p2
                },
            ))
        } else {
            None
        }
    }

    ///The part of this segment lying inside the Y slab, if any.
    pub fn intersection_with_y_slab(&self, slab_start: f64, slab_end: f64) -> Option<Self> {
        if self.direction.y > 0.0 {
            self.cropped_y(slab_start, slab_end, self.start, self.end)
        } else if self.direction.y < 0.0 {
            self.cropped_y(slab_start, slab_end, self.end, self.start)
        } else if self.start.y >= slab_start && self.start.y <= slab_end {
            Some(*self)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crops_to_slab() {
        let segment = ParameterizedSegment::new(DVec3::ZERO, DVec3::new(10.0, 10.0, 10.0));
        let cropped = segment.intersection_with_x_slab(2.0, 4.0).unwrap();
        assert!((cropped.start().x - 2.0).abs() < 1e-9);
        assert!((cropped.end().x - 4.0).abs() < 1e-9);
        assert!((cropped.start().y - 2.0).abs() < 1e-9);
    }

    #[test]
    fn misses_slab() {
        let segment = ParameterizedSegment::new(DVec3::ZERO, DVec3::new(1.0, 0.0, 0.0));
        assert!(segment.intersection_with_x_slab(2.0, 4.0).is_none());
    }

    #[test]
    fn axis_parallel_segment_inside_slab() {
        let segment =
            ParameterizedSegment::new(DVec3::new(3.0, 0.0, 0.0), DVec3::new(3.0, 5.0, 0.0));
        assert!(segment.intersection_with_x_slab(2.0, 4.0).is_some());
        assert!(segment.intersection_with_x_slab(4.0, 6.0).is_none());
    }
}
