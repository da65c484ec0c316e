//! Heading and cost annotation

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use util::maths::unwrap_angle;

use crate::geom::Path;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Annotate each point of the path with its heading, station and turning cost.
///
/// Headings come from the neighbouring points (one sided at the ends) and are unwrapped so they
/// never jump by 2pi. The cost of a point is the total absolute heading change from the start of
/// the path. A single point path keeps its heading.
pub fn annotate(path: &Path) -> Path {
    let mut annotated = path.clone();
    annotated.recompute_arc_length();

    let n = annotated.len();
    if n < 2 {
        return annotated;
    }

    let mut prev_heading: Option<f64> = None;
    let mut cost = 0.0;

    for i in 0..n {
        let before = annotated.points[i.saturating_sub(1)].position2();
        let after = annotated.points[(i + 1).min(n - 1)].position2();
        let diff = after - before;

        let raw = diff.y.atan2(diff.x);

        let heading = match prev_heading {
            Some(h) => {
                let unwrapped = unwrap_angle(h, raw);
                cost += (unwrapped - h).abs();
                unwrapped
            }
            None => raw,
        };

        annotated.points[i].heading_rad = heading;
        annotated.points[i].cost = cost;
        prev_heading = Some(heading);
    }

    annotated
}
