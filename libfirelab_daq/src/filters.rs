//! Smoothing filters used by the data reduction.

/// Centred moving average over `window` samples.
///
/// A point is only defined if the full window around it is available and has no gaps, so the
/// first and last `window / 2` points are always None.
pub fn centered_moving_average(data: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; data.len()];
    if window == 0 || data.len() < window {
        return result;
    }
    let half = window / 2;
    for (start, slice) in data.windows(window).enumerate() {
        let sum: Option<f64> = slice.iter().copied().sum();
        result[start + half] = sum.map(|s| s / window as f64);
    }
    result
}

/// Mean of the defined values. None if there are none
pub fn mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Solve `m * x = b` in place by Gaussian elimination with partial pivoting.
/// Returns None for a singular system
fn solve(mut m: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|a, c| m[*a][col].abs().total_cmp(&m[*c][col].abs()))?;
        if m[pivot][col].abs() < 1.0e-12 {
            return None;
        }
        m.swap(col, pivot);
        b.swap(col, pivot);
        for row in (col + 1)..n {
            let factor = m[row][col] / m[col][col];
            for k in col..n {
                m[row][k] -= factor * m[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| m[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / m[row][row];
    }
    Some(x)
}

/// Weights which evaluate, at sample `pos` of a `window` long segment, the least squares
/// polynomial of degree `order` fitted to that segment
fn savgol_weights(window: usize, order: usize, pos: usize) -> Option<Vec<f64>> {
    let half = (window / 2) as f64;
    // Abscissae scaled to [-1, 1] to keep the normal equations well conditioned
    let x: Vec<f64> = (0..window).map(|i| (i as f64 - half) / half).collect();
    let powers = |xi: f64| -> Vec<f64> { (0..=order).map(|j| xi.powi(j as i32)).collect() };
    let design: Vec<Vec<f64>> = x.iter().map(|xi| powers(*xi)).collect();

    let mut normal = vec![vec![0.0; order + 1]; order + 1];
    for row in design.iter() {
        for j in 0..=order {
            for k in 0..=order {
                normal[j][k] += row[j] * row[k];
            }
        }
    }
    let z = solve(normal, design[pos].clone())?;
    Some(
        design
            .iter()
            .map(|row| row.iter().zip(z.iter()).map(|(a, b)| a * b).sum())
            .collect(),
    )
}

fn apply(weights: &[f64], segment: &[f64]) -> f64 {
    weights.iter().zip(segment).map(|(w, v)| w * v).sum()
}

/// Savitzky-Golay smoothing.
///
/// Interior points use the centred fit. The first and last `window / 2` points are
/// evaluated on the polynomial fitted to the first and last full window. Returns None if the
/// parameters do not allow a fit (window shorter than 3 or even, order not below the window,
/// or fewer samples than the window); callers decide whether to fall back to the raw data.
pub fn savgol_filter(data: &[f64], window: usize, order: usize) -> Option<Vec<f64>> {
    if window < 3 || window % 2 == 0 || order >= window || data.len() < window {
        return None;
    }
    let half = window / 2;
    let n = data.len();
    let center = savgol_weights(window, order, half)?;

    let mut result = Vec::with_capacity(n);
    for i in 0..half {
        result.push(apply(&savgol_weights(window, order, i)?, &data[..window]));
    }
    for i in half..(n - half) {
        result.push(apply(&center, &data[i - half..=i + half]));
    }
    for i in (n - half)..n {
        let pos = i - (n - window);
        result.push(apply(
            &savgol_weights(window, order, pos)?,
            &data[n - window..],
        ));
    }
    Some(result)
}

/// Round to three decimals, as written to the stats files
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
