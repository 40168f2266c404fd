/// Cutout statistics: median, auto threshold, clipped sky level.

use ndarray::ArrayView2;

/// Finite pixel values of a region.
pub(crate) fn finite_samples(data: &ArrayView2<f32>) -> Vec<f32> {
    data.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Median (mean of the two middle values for even lengths). Reorders `data`.
pub(crate) fn find_median(data: &mut [f32]) -> f32 {
    let n = data.len();
    if n == 0 {
        return 0.0;
    }
    let k = n / 2;
    let (lower, upper, _) = data.select_nth_unstable_by(k, f32::total_cmp);
    let upper = *upper;
    if n % 2 == 1 {
        upper
    } else {
        let lower = lower.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        0.5 * (lower + upper)
    }
}

/// Peak threshold when none is configured: median + sigma × mean |x − median|.
pub(crate) fn auto_threshold(samples: &mut [f32], sigma: f32) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let median = find_median(samples);
    let mean_dev = samples.iter().map(|&v| (v - median).abs()).sum::<f32>() / samples.len() as f32;
    median + sigma * mean_dev
}

/// Robust standard deviation about `center` from the median absolute deviation.
fn mad_sigma(values: &[f32], center: f32) -> f32 {
    let mut devs: Vec<f32> = values.iter().map(|&v| (v - center).abs()).collect();
    1.4826 * find_median(&mut devs)
}

/// Sky level of a region: `2.5·median − 1.5·mean` of the samples that
/// survive up to `rounds` passes of `kappa`-sigma clipping about the median.
/// Clipping stops early once nothing is rejected or the spread vanishes;
/// fewer than `MIN_SKY_SAMPLES` survivors fall back to their median.
pub(crate) fn sky_level(samples: &[f32], rounds: usize, kappa: f32) -> f32 {
    const MIN_SKY_SAMPLES: usize = 10;

    let mut kept = samples.to_vec();
    for _ in 0..rounds {
        if kept.len() < MIN_SKY_SAMPLES {
            break;
        }
        let median = find_median(&mut kept);
        let limit = kappa * mad_sigma(&kept, median);
        if limit <= 0.0 {
            break;
        }
        let before = kept.len();
        kept.retain(|&v| (v - median).abs() <= limit);
        if kept.len() == before {
            break;
        }
    }

    let median = find_median(&mut kept);
    if kept.len() < MIN_SKY_SAMPLES {
        return median;
    }
    let mean = kept.iter().map(|&v| v as f64).sum::<f64>() / kept.len() as f64;
    (2.5 * median as f64 - 1.5 * mean) as f32
}
