//! Integer helpers with the exact wraparound and edge policies of the ISA.
//!
//! Register values are `u64`. The `_32` helpers read the low 32 bits of their
//! operands and sign-extend the 32-bit result back to 64 bits.

/// Sign-extend a 32-bit value to a register.
#[inline]
pub const fn sext32(value: u32) -> u64 {
    value as i32 as i64 as u64
}

#[inline]
pub const fn sext16(value: u16) -> u64 {
    value as i16 as i64 as u64
}

#[inline]
pub const fn sext8(value: u8) -> u64 {
    value as i8 as i64 as u64
}

#[inline]
pub const fn low32(value: u64) -> u32 {
    value as u32
}

#[inline]
pub fn div_u64(dividend: u64, divisor: u64) -> u64 {
    dividend.checked_div(divisor).unwrap_or(u64::MAX)
}

#[inline]
pub fn rem_u64(dividend: u64, divisor: u64) -> u64 {
    dividend.checked_rem(divisor).unwrap_or(dividend)
}

pub fn div_s64(dividend: u64, divisor: u64) -> u64 {
    let (b, a) = (dividend as i64, divisor as i64);
    if a == 0 {
        u64::MAX
    } else if a == -1 && b == i64::MIN {
        dividend
    } else {
        (b / a) as u64
    }
}

pub fn rem_s64(dividend: u64, divisor: u64) -> u64 {
    let (b, a) = (dividend as i64, divisor as i64);
    if a == 0 {
        dividend
    } else if a == -1 && b == i64::MIN {
        0
    } else {
        (b % a) as u64
    }
}

#[inline]
pub fn div_u32(dividend: u64, divisor: u64) -> u64 {
    match low32(dividend).checked_div(low32(divisor)) {
        Some(q) => sext32(q),
        None => u64::MAX,
    }
}

#[inline]
pub fn rem_u32(dividend: u64, divisor: u64) -> u64 {
    let (b, a) = (low32(dividend), low32(divisor));
    sext32(b.checked_rem(a).unwrap_or(b))
}

pub fn div_s32(dividend: u64, divisor: u64) -> u64 {
    let (b, a) = (low32(dividend) as i32, low32(divisor) as i32);
    if a == 0 {
        u64::MAX
    } else if a == -1 && b == i32::MIN {
        sext32(b as u32)
    } else {
        sext32((b / a) as u32)
    }
}

pub fn rem_s32(dividend: u64, divisor: u64) -> u64 {
    let (b, a) = (low32(dividend) as i32, low32(divisor) as i32);
    if a == 0 {
        sext32(b as u32)
    } else if a == -1 && b == i32::MIN {
        0
    } else {
        sext32((b % a) as u32)
    }
}

#[inline]
pub fn shl32(value: u64, shift: u64) -> u64 {
    sext32(low32(value) << (shift % 32))
}

#[inline]
pub fn shr32(value: u64, shift: u64) -> u64 {
    sext32(low32(value) >> (shift % 32))
}

#[inline]
pub fn sar32(value: u64, shift: u64) -> u64 {
    sext32(((low32(value) as i32) >> (shift % 32)) as u32)
}

#[inline]
pub fn shl64(value: u64, shift: u64) -> u64 {
    value << (shift % 64)
}

#[inline]
pub fn shr64(value: u64, shift: u64) -> u64 {
    value >> (shift % 64)
}

#[inline]
pub fn sar64(value: u64, shift: u64) -> u64 {
    ((value as i64) >> (shift % 64)) as u64
}

/// Upper 64 bits of the 128-bit product of two unsigned values.
///
/// `0xffff_ffff_ffff_ffff * 0xffff_ffff_ffff_ffff` has upper word
/// `0xffff_ffff_ffff_fffe`.
#[inline]
pub fn mul_upper_u_u(a: u64, b: u64) -> u64 {
    ((u128::from(a) * u128::from(b)) >> 64) as u64
}

/// Upper word of a signed product, by sign and magnitude: the unsigned upper
/// word of `|a| * |b|`, negated when the signs differ.
pub fn mul_upper_s_s(a: u64, b: u64) -> u64 {
    let (a, b) = (a as i64, b as i64);
    let upper = mul_upper_u_u(a.unsigned_abs(), b.unsigned_abs());
    if (a < 0) != (b < 0) { upper.wrapping_neg() } else { upper }
}

/// Signed `a` times unsigned `b`, same rule as [`mul_upper_s_s`].
pub fn mul_upper_s_u(a: u64, b: u64) -> u64 {
    let a = a as i64;
    let upper = mul_upper_u_u(a.unsigned_abs(), b);
    if a < 0 { upper.wrapping_neg() } else { upper }
}
