//! Piecewise-linear scoring curves.

use rentscout_core::Anchor;

/// Score `x` against sorted anchors.
///
/// Values between two anchors interpolate linearly. Values outside the
/// anchor range take the nearest end anchor's score. The result is clamped
/// to `[0, 100]`. An empty anchor list scores zero.
#[must_use]
pub fn interpolate(anchors: &[Anchor], x: f64) -> f64 {
    let (Some(first), Some(last)) = (anchors.first(), anchors.last()) else {
        return 0.0;
    };

    let score = if x <= first.x() {
        first.score()
    } else if x >= last.x() {
        last.score()
    } else {
        anchors
            .windows(2)
            .find(|w| x <= w[1].x())
            .map_or(last.score(), |w| {
                let (lo, hi) = (w[0], w[1]);
                let t = (x - lo.x()) / (hi.x() - lo.x());
                lo.score() + t * (hi.score() - lo.score())
            })
    };

    score.clamp(0.0, 100.0)
}
