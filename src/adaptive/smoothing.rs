use crate::geometry::Micron;

const SMOOTHING_ROUNDS: usize = 6;

///Configuration of the Gaussian layer-height smoothing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerHeightSmoothingParams {
    ///Kernel radius in layers.
    pub radius: u32,
    pub min_layer_height: Micron,
    pub max_layer_height: Micron,
    ///Never let a smoothed height exceed the original one.
    pub keep_min: bool,
}

fn gaussian_kernel(radius: u32) -> Vec<f64> {
    let size = 2 * radius + 1;
    let sigma = 0.3 * (radius as f64 - 1.0) + 0.8;
    let two_sq_sigma = 2.0 * sigma * sigma;
    let inv_root_two_pi_sq_sigma = 1.0 / (std::f64::consts::PI * two_sq_sigma).sqrt();

    (0..size)
        .map(|i| {
            let x = i as f64 - radius as f64;
            inv_root_two_pi_sq_sigma * (-x * x / two_sq_sigma).exp()
        })
        .collect()
}

fn gaussian_blur(
    layer_heights: &[Micron],
    kernel: &[f64],
    params: &LayerHeightSmoothingParams,
) -> Vec<Micron> {
    if layer_heights.len() < 6 {
        return layer_heights.to_vec();
    }

    let radius = (kernel.len() / 2) as i64;
    let mut result = Vec::with_capacity(layer_heights.len());

    // The first layer stays as it is.
    result.push(layer_heights[0]);

    let delta_h = (params.max_layer_height - params.min_layer_height) as f64;
    let inv_delta_h = if delta_h != 0.0 { 1.0 / delta_h } else { 1.0 };

    for i in 1..layer_heights.len() {
        let original_height = layer_heights[i];
        let mut height = 0.0;
        let mut weight_total = 0.0;

        let begin = (i as i64 - radius).max(1);
        let end = (i as i64 + radius).min(layer_heights.len() as i64 - 1);

        for j in begin..=end {
            let kernel_id = (radius + (j - i as i64)) as usize;
            if kernel_id < kernel.len() {
                let dh = (params.max_layer_height - layer_heights[j as usize]).abs() as f64;
                let weight = kernel[kernel_id] * (dh * inv_delta_h).sqrt();
                height += weight * layer_heights[j as usize] as f64;
                weight_total += weight;
            }
        }

        let mut smoothed = if weight_total == 0.0 {
            original_height
        } else {
            (height / weight_total) as Micron
        };
        smoothed = smoothed.clamp(params.min_layer_height, params.max_layer_height);

        if params.keep_min {
            smoothed = smoothed.min(original_height);
        }

        result.push(smoothed);
    }

    result
}

///Blur the height profile with a Gaussian kernel over several rounds,
///clamping each output into the allowed height range.
pub fn smooth_layer_heights(
    layer_heights: &[Micron],
    params: &LayerHeightSmoothingParams,
) -> Vec<Micron> {
    if layer_heights.len() < 2 {
        return layer_heights.to_vec();
    }

    let kernel = gaussian_kernel(params.radius.max(1));

    let mut result = layer_heights.to_vec();
    for _ in 0..SMOOTHING_ROUNDS {
        result = gaussian_blur(&result, &kernel, params);
    }

    result
}
