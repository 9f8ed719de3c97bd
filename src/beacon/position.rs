/// Rounds half-way values towards positive infinity, so `-2.5` becomes `-2`
/// and `2.5` becomes `3`. Non-finite positions report as 0.
pub fn round_position(secs: f64) -> i64 {
    if !secs.is_finite() {
        return 0;
    }
    let nearest = secs.round();
    // f64::round sends negative halves away from zero; pull them back up
    if nearest - secs == -0.5 {
        (nearest + 1.0) as i64
    } else {
        nearest as i64
    }
}

/// Computes the `fts` value of a beacon.
///
/// - VOD: the rounded playback position.
/// - Live at the edge (rounded position `>= 0`): skew-corrected wall-clock time.
///   The position itself only matters through its sign.
/// - Live inside the DVR window (rounded position `< 0`): wall-clock time
///   shifted back by the rewind offset, then skew-corrected.
///
/// The sign test is applied to the rounded position, never the raw one.
pub fn reportable_position(position_secs: f64, now: i64, skew: i64, live: bool) -> i64 {
    let fts = round_position(position_secs);
    if !live {
        return fts;
    }
    if fts < 0 {
        now + fts - skew
    } else {
        now - skew
    }
}
