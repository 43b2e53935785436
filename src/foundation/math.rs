pub(crate) fn gcd_u64(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Least common multiple; both inputs must be non-zero.
pub(crate) fn lcm_u64(a: u64, b: u64) -> u64 {
    (a / gcd_u64(a, b)) * b
}

pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

/// Straight-alpha `c` composited over an opaque background channel.
pub(crate) fn composite_over(c: u8, a: u8, bg: u8) -> u8 {
    let a = u16::from(a);
    let inv = 255 - a;
    let v = mul_div255_u16(u16::from(c), a) + mul_div255_u16(u16::from(bg), inv);
    v.min(255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
