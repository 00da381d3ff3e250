use crate::telemetry::TelemetrySample;

/// Cumulative time gap of `compare` relative to `reference`, sampled at the
/// reference lap's distances.
///
/// The compare lap's elapsed time is linearly interpolated at every reference
/// distance; positive values mean the compare lap is behind. Distances outside
/// the compare lap are extrapolated from its first and last segments. Both laps
/// must be sorted by distance. Returns `(distance, delta_s)` pairs, empty when
/// either lap has fewer than two samples.
pub fn delta_time(reference: &[TelemetrySample], compare: &[TelemetrySample]) -> Vec<(f64, f64)> {
    if reference.len() < 2 || compare.len() < 2 {
        return Vec::new();
    }

    let mut distance = Vec::with_capacity(compare.len() + 2);
    let mut time = Vec::with_capacity(compare.len() + 2);
    distance.push(extend_before(compare[0].distance, compare[1].distance));
    time.push(extend_before(compare[0].time_s, compare[1].time_s));
    for sample in compare {
        distance.push(sample.distance);
        time.push(sample.time_s);
    }
    let n = compare.len();
    distance.push(extend_after(compare[n - 2].distance, compare[n - 1].distance));
    time.push(extend_after(compare[n - 2].time_s, compare[n - 1].time_s));

    reference
        .iter()
        .map(|sample| {
            let compare_time = interpolate(&distance, &time, sample.distance);
            (sample.distance, compare_time - sample.time_s)
        })
        .collect()
}

fn extend_before(first: f64, second: f64) -> f64 {
    first - (second - first)
}

fn extend_after(second_last: f64, last: f64) -> f64 {
    last + (last - second_last)
}

/// Piecewise-linear interpolation over sorted `xs`; clamps outside the range.
fn interpolate(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let last = xs.len() - 1;
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[last] {
        return ys[last];
    }
    let upper = xs.partition_point(|v| *v <= x).min(last);
    let lower = upper - 1;
    let span = xs[upper] - xs[lower];
    if span <= 0. {
        return ys[lower];
    }
    let t = (x - xs[lower]) / span;
    ys[lower] + t * (ys[upper] - ys[lower])
}
