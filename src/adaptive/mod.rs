mod smoothing;

pub use smoothing::{smooth_layer_heights, LayerHeightSmoothingParams};

use crate::error::PlanError;
use crate::geometry::{lerp, mm_to_micron, micron_to_mm, Micron};

const EPSILON: f64 = 1e-6;

///Slope data of one triangle face: its Z span in mm, the vertical and
///horizontal components of its unit normal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceSlope {
    pub z_min: f64,
    pub z_max: f64,
    ///`|nz|` of the unit normal.
    pub n_cos: f64,
    ///`sqrt(nx² + ny²)` of the unit normal.
    pub n_sin: f64,
}

impl FaceSlope {
    pub fn is_degenerate(&self) -> bool {
        !self.z_min.is_finite() || !self.z_max.is_finite() || self.z_max < self.z_min
    }
}

///One computed layer: its top Z position and thickness in microns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdaptiveLayer {
    pub z_position: Micron,
    pub layer_height: Micron,
    pub temperature: Option<i32>,
}

///Computes per-layer thicknesses from the surface slopes of the model.
///Two algorithms are available: the legacy step-quantised one, and the
///surface-deviation one controlled by a quality factor.
pub struct AdaptiveLayerHeights {
    layers: Vec<AdaptiveLayer>,
}

impl AdaptiveLayerHeights {
    pub fn layers(&self) -> &[AdaptiveLayer] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    ///Legacy algorithm. Allowed heights are the base height plus integer
    ///multiples of `step_size` within `max_variation`; at each level the
    ///largest allowed height keeping the horizontal stairstep of every
    ///intersecting face within `threshold` is chosen. All parameters in
    ///mm.
    pub fn legacy(
        base_layer_height: f64,
        max_variation: f64,
        step_size: f64,
        threshold: f64,
        mut faces: Vec<FaceSlope>,
        object_height: f64,
    ) -> Result<Self, PlanError> {
        if base_layer_height <= 0.0 {
            return Err(PlanError::InvalidLayerHeight {
                value: base_layer_height,
            });
        }

        faces.retain(|face| !face.is_degenerate());

        // Allowed heights, largest first.
        let mut allowed_heights: Vec<f64> = Vec::new();
        let mut variation = 0.0;
        while variation <= max_variation + EPSILON {
            if base_layer_height + variation > 0.0 {
                allowed_heights.push(base_layer_height + variation);
            }
            if variation > 0.0 && base_layer_height - variation > 0.0 {
                allowed_heights.push(base_layer_height - variation);
            }
            if step_size <= 0.0 {
                break;
            }
            variation += step_size;
        }
        allowed_heights.sort_by(|a, b| b.total_cmp(a));

        let minimum_height = *allowed_heights
            .last()
            .expect("the base height is always allowed");

        let mut layers = Vec::new();
        let mut z = 0.0;
        while z < object_height - EPSILON {
            let mut chosen = minimum_height;
            'heights: for height in &allowed_heights {
                for face in &faces {
                    if face.z_min >= z + height || face.z_max <= z {
                        continue;
                    }
                    // Horizontal distance covered by this layer on the
                    // face; flat faces force the smallest step.
                    let horizontal_step = if face.n_sin < EPSILON {
                        f64::INFINITY
                    } else {
                        height * face.n_cos / face.n_sin
                    };
                    if horizontal_step > threshold {
                        continue 'heights;
                    }
                }
                chosen = *height;
                break;
            }

            z += chosen;
            layers.push(AdaptiveLayer {
                z_position: mm_to_micron(z),
                layer_height: mm_to_micron(chosen),
                temperature: None,
            });
        }

        Ok(Self { layers })
    }

    ///Quality-factor algorithm. The maximum surface deviation is derived
    ///from `quality_factor` (0 best, 1 fastest) and each layer takes the
    ///smallest height any intersecting face demands, clamped to the given
    ///bounds. All heights in mm.
    pub fn advanced(
        min_layer_height: f64,
        max_layer_height: f64,
        quality_factor: f64,
        mut faces: Vec<FaceSlope>,
        object_height: f64,
    ) -> Result<Self, PlanError> {
        if min_layer_height <= 0.0 {
            return Err(PlanError::InvalidLayerHeight {
                value: min_layer_height,
            });
        }

        faces.retain(|face| !face.is_degenerate());
        faces.sort_by(|a, b| {
            (a.z_min, a.z_max)
                .partial_cmp(&(b.z_min, b.z_max))
                .expect("degenerate faces were filtered out")
        });

        let mut layers = Vec::new();
        let mut z = 0.0;
        let mut current_facet = 0;
        while z < object_height - EPSILON {
            let height_microns = next_layer_height(
                &faces,
                z,
                quality_factor,
                min_layer_height,
                max_layer_height,
                &mut current_facet,
            );
            let height = micron_to_mm(height_microns);

            z += height;
            layers.push(AdaptiveLayer {
                z_position: mm_to_micron(z),
                layer_height: height_microns,
                temperature: None,
            });
        }

        Ok(Self { layers })
    }

    ///Apply Gaussian smoothing to the height profile and rebuild the Z
    ///positions by cumulative summation.
    pub fn smooth(&mut self, params: &LayerHeightSmoothingParams) {
        let heights: Vec<Micron> = self.layers.iter().map(|layer| layer.layer_height).collect();
        let smoothed = smooth_layer_heights(&heights, params);

        let mut z = 0;
        for (layer, height) in self.layers.iter_mut().zip(smoothed) {
            z += height;
            layer.layer_height = height;
            layer.z_position = z;
        }
    }
}

///The layer height a single face allows: constant surface error measured
///as the area of the error triangle, clamped to the roughness limit.
fn layer_height_from_slope(face: &FaceSlope, max_surface_deviation: f64) -> Micron {
    let roughness_limit = max_surface_deviation / 0.184;
    let calculated = if face.n_cos > 1e-5 {
        mm_to_micron(1.44 * max_surface_deviation * (face.n_sin / face.n_cos).sqrt())
    } else {
        Micron::MAX
    };
    calculated.min(mm_to_micron(roughness_limit))
}

fn next_layer_height(
    faces: &[FaceSlope],
    print_z: f64,
    quality_factor: f64,
    min_layer_height: f64,
    max_layer_height: f64,
    current_facet: &mut usize,
) -> Micron {
    let mut height = mm_to_micron(max_layer_height);

    let max_surface_deviation = {
        let delta_min = min_layer_height;
        let delta_mid = (min_layer_height + max_layer_height) / 2.0;
        let delta_max = max_layer_height;
        if quality_factor < 0.5 {
            lerp(delta_min, delta_mid, 2.0 * quality_factor)
        } else {
            lerp(delta_max, delta_mid, 2.0 * (1.0 - quality_factor))
        }
    };

    let min_height = mm_to_micron(min_layer_height);

    // All faces intersecting this layer level constrain the height.
    let mut ordered_id = *current_facet;
    let mut first_hit = false;
    while ordered_id < faces.len() {
        let face = &faces[ordered_id];
        if face.z_min >= print_z {
            break;
        }
        if face.z_max > print_z {
            if !first_hit {
                first_hit = true;
                *current_facet = ordered_id;
            }
            // Faces barely touching the level would produce spurious
            // tiny cusp values.
            if face.z_max >= print_z + EPSILON {
                height = height.min(layer_height_from_slope(face, max_surface_deviation));
            }
        }
        ordered_id += 1;
    }

    height = height.max(min_height);

    // Shrink further if a sloped face starts inside the tentative layer,
    // so the slope change is not skipped over.
    if height > min_height {
        while ordered_id < faces.len() {
            let face = &faces[ordered_id];
            if face.z_min >= print_z + micron_to_mm(height) {
                break;
            }
            if face.z_max >= print_z + EPSILON {
                let reduced = layer_height_from_slope(face, max_surface_deviation);
                let z_diff = mm_to_micron(face.z_min - print_z);
                if reduced < z_diff {
                    // Stop just below the offending face.
                    height = height.min(z_diff.max(min_height));
                } else {
                    height = height.min(reduced);
                }
            }
            ordered_id += 1;
        }
        height = height.max(min_height);
    }

    height
}

#[cfg(test)]
mod tests {
    use super::*;

    ///A 45° slanted face with `n_cos = n_sin = 0.5` at deviation 0.05 mm
    ///allows `min(0.05/0.184, 1.44·0.05·√1) = 0.072 mm`.
    #[test]
    fn slanted_face_height_follows_deviation() {
        let face = FaceSlope {
            z_min: 0.0,
            z_max: 10.0,
            n_cos: 0.5,
            n_sin: 0.5,
        };
        assert_eq!(layer_height_from_slope(&face, 0.05), 72);
    }

    #[test]
    fn advanced_heights_cover_the_object() {
        let faces = vec![FaceSlope {
            z_min: 0.0,
            z_max: 10.0,
            n_cos: 0.5,
            n_sin: 0.5,
        }];
        // Quality factor 0.1 keeps the deviation near the minimum height.
        let adaptive = AdaptiveLayerHeights::advanced(0.1, 0.3, 0.1, faces, 10.0).unwrap();

        let top = adaptive.layers().last().unwrap();
        assert!(micron_to_mm(top.z_position) >= 10.0 - 1e-3);
        for layer in adaptive.layers() {
            assert!(layer.layer_height >= 100);
            assert!(layer.layer_height <= 300);
        }
    }

    #[test]
    fn quality_factor_zero_prints_finer_than_one() {
        let faces = vec![FaceSlope {
            z_min: 0.0,
            z_max: 10.0,
            n_cos: 0.9,
            n_sin: 0.435,
        }];
        let fine = AdaptiveLayerHeights::advanced(0.1, 0.3, 0.0, faces.clone(), 10.0).unwrap();
        let fast = AdaptiveLayerHeights::advanced(0.1, 0.3, 1.0, faces, 10.0).unwrap();
        assert!(fine.layer_count() >= fast.layer_count());
    }

    #[test]
    fn legacy_flat_face_forces_minimum_height() {
        let faces = vec![FaceSlope {
            z_min: 4.95,
            z_max: 5.05,
            n_cos: 1.0,
            n_sin: 0.0,
        }];
        let adaptive =
            AdaptiveLayerHeights::legacy(0.2, 0.1, 0.05, 0.5, faces, 10.0).unwrap();

        // Layers crossing the near-flat band use the smallest height.
        let crossing: Vec<_> = adaptive
            .layers()
            .iter()
            .filter(|layer| {
                let top = micron_to_mm(layer.z_position);
                let bottom = top - micron_to_mm(layer.layer_height);
                bottom < 5.05 && top > 4.95
            })
            .collect();
        assert!(!crossing.is_empty());
        for layer in crossing {
            assert_eq!(layer.layer_height, 100);
        }
    }

    #[test]
    fn legacy_without_faces_uses_largest_height() {
        let adaptive = AdaptiveLayerHeights::legacy(0.2, 0.1, 0.05, 0.2, vec![], 1.0).unwrap();
        for layer in adaptive.layers() {
            assert_eq!(layer.layer_height, 300);
        }
    }

    #[test]
    fn non_positive_base_height_fails() {
        assert!(AdaptiveLayerHeights::legacy(0.0, 0.1, 0.05, 0.2, vec![], 1.0).is_err());
        assert!(AdaptiveLayerHeights::advanced(0.0, 0.3, 0.5, vec![], 1.0).is_err());
    }
}
