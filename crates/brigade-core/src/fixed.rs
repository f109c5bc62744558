use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
///
/// All thermal math (pan temperature, water temperature, heat rates) runs on
/// this type so that two kitchens fed the same commands stay bit-identical,
/// regardless of platform float behavior.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of service time. One tick is one second.
pub type Ticks = u64;

/// Convert an f64 to Fixed64. Use only for initialization, never in the tick loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display/UI, never in the tick loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}
