//! Unit-ball volumes in real-valued dimensions.

use std::f64::consts::PI;

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFICIENTS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

/// Natural logarithm of the gamma function for `x >= 0.5` (Lanczos).
pub(crate) fn ln_gamma(x: f64) -> f64 {
    let shifted = x - 1.0;
    let (head, tail) = LANCZOS_COEFFICIENTS.split_at(1);
    let series = tail
        .iter()
        .enumerate()
        .fold(head[0], |acc, (offset, coefficient)| {
            acc + coefficient / (shifted + (offset + 1) as f64)
        });
    let t = shifted + LANCZOS_G + 0.5;
    0.5 * (2.0 * PI).ln() + (shifted + 0.5) * t.ln() - t + series.ln()
}

/// Natural logarithm of the volume of the unit ball in `dimension`
/// dimensions: `ln(pi^(d/2) / gamma(d/2 + 1))`.
pub(crate) fn ln_unit_ball_volume(dimension: f64) -> f64 {
    let half = 0.5 * dimension;
    half * PI.ln() - ln_gamma(half + 1.0)
}
