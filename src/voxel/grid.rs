use dashmap::DashMap;
use glam::DVec3;
use rayon::prelude::*;

use crate::error::PlanError;
use crate::geometry::{micron_to_mm, Micron, ParameterizedSegment, Point3};

///Axis-aligned bounding box in microns.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb3 {
    pub min: Point3,
    pub max: Point3,
}

impl Aabb3 {
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    pub fn include(&mut self, p: Point3) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    pub fn span(&self) -> Point3 {
        self.max - self.min
    }

    pub fn is_empty(&self) -> bool {
        let span = self.span();
        span.x <= 0 || span.y <= 0 || span.z <= 0
    }
}

///Position of a voxel inside the grid. The three 16-bit components pack
///into a single u64 map key, which bounds the grid at 65k cells per axis;
///enough for a 6.5 m build plate at 0.1 mm resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LocalCoordinates {
    pub x: u16,
    pub y: u16,
    pub z: u16,
}

impl LocalCoordinates {
    pub fn new(x: u16, y: u16, z: u16) -> Self {
        Self { x, y, z }
    }

    pub fn key(self) -> u64 {
        self.x as u64 | (self.y as u64) << 16 | (self.z as u64) << 32
    }

    pub fn from_key(key: u64) -> Self {
        Self {
            x: (key & 0xffff) as u16,
            y: ((key >> 16) & 0xffff) as u16,
            z: ((key >> 32) & 0xffff) as u16,
        }
    }
}

///A sparse, thread-safe voxel grid over a 3D bounding box. Only occupied
///voxels are stored; the value of a voxel is the number of the extruder
///that owns it.
///
///The per-axis resolution is derived from the box span so that the span is
///an integer multiple of the resolution, never coarser than the requested
///maximum.
#[derive(Debug)]
pub struct VoxelGrid {
    origin: DVec3,
    resolution: DVec3,
    slices_count: [u16; 3],
    occupied: DashMap<u64, u8>,
}

impl VoxelGrid {
    pub fn new(bounding_box: &Aabb3, max_resolution: Micron) -> Result<Self, PlanError> {
        if bounding_box.is_empty() {
            return Err(PlanError::EmptyBoundingBox);
        }
        if max_resolution <= 0 {
            return Err(PlanError::SettingNotPositive {
                setting: "max_resolution".to_string(),
                value: max_resolution as f64,
            });
        }

        let span = bounding_box.span().to_mm();
        let max_resolution = micron_to_mm(max_resolution);

        let mut slices_count = [0_u16; 3];
        let mut resolution = DVec3::ZERO;
        for (axis, span_axis) in [span.x, span.y, span.z].into_iter().enumerate() {
            let slices = (span_axis / max_resolution) as u64 + 1;
            let slices = slices.min(u16::MAX as u64);
            slices_count[axis] = slices as u16;
            resolution[axis] = span_axis / slices as f64;
        }

        Ok(Self {
            origin: bounding_box.min.to_mm(),
            resolution,
            slices_count,
            occupied: DashMap::new(),
        })
    }

    pub fn resolution(&self) -> DVec3 {
        self.resolution
    }

    pub fn slices_count(&self) -> [u16; 3] {
        self.slices_count
    }

    pub fn set(&self, position: LocalCoordinates, extruder_nr: u8) {
        self.occupied.insert(position.key(), extruder_nr);
    }

    ///Insert, or lower an existing occupation to `extruder_nr`. Used to
    ///resolve ownership when several features claim the same voxel: the
    ///lowest extruder number wins.
    pub fn set_or_min(&self, position: LocalCoordinates, extruder_nr: u8) {
        self.occupied
            .entry(position.key())
            .and_modify(|value| *value = (*value).min(extruder_nr))
            .or_insert(extruder_nr);
    }

    pub fn get(&self, position: LocalCoordinates) -> Option<u8> {
        self.occupied.get(&position.key()).map(|value| *value)
    }

    pub fn occupied_count(&self) -> usize {
        self.occupied.len()
    }

    ///Visit all occupied voxels in parallel. The visitor runs on many
    ///threads simultaneously and must not call back into this grid.
    pub fn visit_occupied<F>(&self, visitor: F)
    where
        F: Fn(LocalCoordinates, u8) + Send + Sync,
    {
        self.occupied
            .par_iter()
            .for_each(|entry| visitor(LocalCoordinates::from_key(*entry.key()), *entry.value()));
    }

    ///The up-to-26 in-bounds neighbours of a voxel.
    pub fn neighbours_26(&self, position: LocalCoordinates) -> Vec<LocalCoordinates> {
        let mut neighbours = Vec::with_capacity(26);
        for delta_x in -1_i32..2 {
            let x = position.x as i32 + delta_x;
            if x < 0 || x >= self.slices_count[0] as i32 {
                continue;
            }
            for delta_y in -1_i32..2 {
                let y = position.y as i32 + delta_y;
                if y < 0 || y >= self.slices_count[1] as i32 {
                    continue;
                }
                for delta_z in -1_i32..2 {
                    let z = position.z as i32 + delta_z;
                    if z < 0 || z >= self.slices_count[2] as i32 {
                        continue;
                    }
                    if delta_x != 0 || delta_y != 0 || delta_z != 0 {
                        neighbours.push(LocalCoordinates::new(x as u16, y as u16, z as u16));
                    }
                }
            }
        }
        neighbours
    }

    fn to_local_axis(&self, value: f64, axis: usize) -> u16 {
        let index = ((value - self.origin[axis]) / self.resolution[axis]).floor();
        index.clamp(0.0, (self.slices_count[axis] - 1) as f64) as u16
    }

    fn to_global_axis(&self, index: u16, axis: usize, at_center: bool) -> f64 {
        index as f64 * self.resolution[axis]
            + self.origin[axis]
            + if at_center {
                self.resolution[axis] / 2.0
            } else {
                0.0
            }
    }

    pub fn to_local(&self, position: Point3) -> LocalCoordinates {
        let mm = position.to_mm();
        LocalCoordinates::new(
            self.to_local_axis(mm.x, 0),
            self.to_local_axis(mm.y, 1),
            self.to_local_axis(mm.z, 2),
        )
    }

    ///The millimetre position of a voxel, at its centre by default.
    pub fn to_global(&self, position: LocalCoordinates, at_center: bool) -> DVec3 {
        DVec3::new(
            self.to_global_axis(position.x, 0, at_center),
            self.to_global_axis(position.y, 1, at_center),
            self.to_global_axis(position.z, 2, at_center),
        )
    }

    ///All voxels traversed by the triangle; a 3D rasterisation.
    ///
    ///Iterates the X slabs of the triangle's bounding range, crops the
    ///triangle edges to each slab, then iterates the Y columns of the
    ///cropped shape, crops again and walks the Z range of the remainder.
    pub fn voxels_traversed_by(&self, triangle: &[Point3; 3]) -> Vec<LocalCoordinates> {
        let p0 = triangle[0].to_mm();
        let p1 = triangle[1].to_mm();
        let p2 = triangle[2].to_mm();

        let s1 = ParameterizedSegment::new(p0, p1);
        let s2 = ParameterizedSegment::new(p1, p2);
        let s3 = ParameterizedSegment::new(p2, p0);

        let mut traversed = Vec::new();

        let x_min = self
            .to_local_axis(p0.x, 0)
            .min(self.to_local_axis(p1.x, 0))
            .min(self.to_local_axis(p2.x, 0));
        let x_max = self
            .to_local_axis(p0.x, 0)
            .max(self.to_local_axis(p1.x, 0))
            .max(self.to_local_axis(p2.x, 0));

        for x in x_min..=x_max {
            let slab_start = self.to_global_axis(x, 0, false);
            let slab_end = self.to_global_axis(x + 1, 0, false);

            let mut y_values: Vec<f64> = Vec::with_capacity(6);
            for segment in [&s1, &s2, &s3] {
                if let Some(cropped) = segment.intersection_with_x_slab(slab_start, slab_end) {
                    y_values.push(cropped.start().y);
                    y_values.push(cropped.end().y);
                }
            }
            if y_values.is_empty() {
                continue;
            }

            let y_min = self.to_local_axis(y_values.iter().copied().fold(f64::MAX, f64::min), 1);
            let y_max = self.to_local_axis(y_values.iter().copied().fold(f64::MIN, f64::max), 1);

            for y in y_min..=y_max {
                let column_start = self.to_global_axis(y, 1, false);
                let column_end = self.to_global_axis(y + 1, 1, false);

                let mut z_values: Vec<f64> = Vec::with_capacity(6);
                for segment in [&s1, &s2, &s3] {
                    if let Some(cropped) = segment.intersection_with_x_slab(slab_start, slab_end) {
                        if let Some(cropped) =
                            cropped.intersection_with_y_slab(column_start, column_end)
                        {
                            z_values.push(cropped.start().z);
                            z_values.push(cropped.end().z);
                        }
                    }
                }
                if z_values.is_empty() {
                    continue;
                }

                let z_min =
                    self.to_local_axis(z_values.iter().copied().fold(f64::MAX, f64::min), 2);
                let z_max =
                    self.to_local_axis(z_values.iter().copied().fold(f64::MIN, f64::max), 2);

                for z in z_min..=z_max {
                    traversed.push(LocalCoordinates::new(x, y, z));
                }
            }
        }

        traversed
    }
}
