//! Unit conversions shared by the engine and its front ends

/// Convert a millimetre offset to local units
#[inline(always)]
pub fn mm_to_units(millimetres: i32, millimetres_per_unit: f64) -> f64 {
    f64::from(millimetres) / millimetres_per_unit
}

/// Bring an angle in degrees into `[0, 360)`
#[inline]
pub fn normalize_degrees(degrees: f64) -> f64 {
    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if normalized >= 360.0 { 0.0 } else { normalized }
}
