//! Score normalisation.

/// Numerically stable softmax: subtract the maximum before exponentiating.
///
/// Outputs sum to 1 regardless of the magnitude or sign of the inputs.
pub fn softmax(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return vec![];
    }

    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max.is_infinite() {
        // inf - inf is NaN; split the mass over the entries at the infinite maximum
        let at_max = values.iter().filter(|&&v| v == max).count() as f64;
        return values
            .iter()
            .map(|&v| if v == max { 1.0 / at_max } else { 0.0 })
            .collect();
    }
    let exps: Vec<f64> = values.iter().map(|v| (v - max).exp()).collect();
    // The maximum contributes exp(0) = 1, so the sum is never zero
    let sum: f64 = exps.iter().sum();

    exps.into_iter().map(|e| e / sum).collect()
}

/// Convert a distribution to percentages with one decimal place.
///
/// Works in tenths of a percent: every value is floored, then the leftover
/// tenths go to the largest remainders (earlier entries win ties). Each
/// result is within 0.1 of `p * 100` and the results sum to exactly 100.0.
///
/// This is not round-to-nearest. A value whose fraction is above .05 can
/// still land on the lower tenth when the leftover runs out first, e.g.
/// 22.4506 becomes 22.4. Nearest rounding drifts from 100.0 by up to 0.05
/// per entry, so with three or more diseases it can break the total.
pub fn to_percentages(probabilities: &[f64]) -> Vec<f64> {
    const TOTAL_TENTHS: i64 = 1000;

    if probabilities.is_empty() {
        return vec![];
    }

    let exact: Vec<f64> = probabilities
        .iter()
        .map(|p| p * TOTAL_TENTHS as f64)
        .collect();
    let mut tenths: Vec<i64> = exact
        .iter()
        .map(|t| if t.is_finite() { t.floor() as i64 } else { 0 })
        .collect();

    let mut leftover = TOTAL_TENTHS - tenths.iter().sum::<i64>();

    let mut by_remainder: Vec<usize> = (0..exact.len()).collect();
    // Stable sort keeps input order among equal remainders
    by_remainder.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal)
    });

    for &i in by_remainder.iter().cycle().take(by_remainder.len() * 2) {
        if leftover <= 0 {
            break;
        }
        tenths[i] += 1;
        leftover -= 1;
    }

    tenths.into_iter().map(|t| t as f64 / 10.0).collect()
}
