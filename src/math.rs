// 2.0: fixed-point arithmetic. WAD (1e18) for percentage-scale values, RAY (1e27)
// for high-precision rate compounding. every multiply/divide rounds half-up so
// value never leaks across repeated calls; both debt and supplier value accrue
// through this path.
//
// all functions are pure and total over the domain where the true result fits
// u128. intermediates go through U256 because RAY products overflow u128.

use primitive_types::U256;

/// Percentage-scale fixed-point base, 18 decimals.
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// High-precision fixed-point base, 27 decimals.
pub const RAY: u128 = 1_000_000_000_000_000_000_000_000_000;

/// WAD -> RAY scale factor.
const WAD_TO_RAY: u128 = 1_000_000_000;

pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// (a * b + denominator/2) / denominator, computed at 256 bits.
fn mul_div_half_up(a: u128, b: u128, denominator: u128) -> u128 {
    debug_assert!(denominator > 0);
    let product = U256::from(a) * U256::from(b) + U256::from(denominator / 2);
    let result = product / U256::from(denominator);
    debug_assert!(result <= U256::from(u128::MAX));
    result.as_u128()
}

pub fn wad_mul(a: u128, b: u128) -> u128 {
    mul_div_half_up(a, b, WAD)
}

pub fn wad_div(a: u128, b: u128) -> u128 {
    mul_div_half_up(a, WAD, b)
}

pub fn ray_mul(a: u128, b: u128) -> u128 {
    mul_div_half_up(a, b, RAY)
}

pub fn ray_div(a: u128, b: u128) -> u128 {
    mul_div_half_up(a, RAY, b)
}

pub fn wad_to_ray(wad: u128) -> u128 {
    wad * WAD_TO_RAY
}

pub fn ray_to_wad(ray: u128) -> u128 {
    (ray + WAD_TO_RAY / 2) / WAD_TO_RAY
}

/// x^n at RAY precision via square-and-multiply. x^0 == RAY.
///
/// Compounds a per-second factor over an elapsed duration in O(log n)
/// multiplications instead of iterating once per second.
pub fn ray_pow(x: u128, mut n: u64) -> u128 {
    let mut base = x;
    let mut result = if n % 2 == 1 { x } else { RAY };
    n /= 2;
    while n > 0 {
        base = ray_mul(base, base);
        if n % 2 == 1 {
            result = ray_mul(result, base);
        }
        n /= 2;
    }
    result
}

/// Converts an annualized WAD-scaled rate into the per-second RAY-scaled
/// compounding factor: RAY + rate / secondsPerYear, rounded.
pub fn annual_rate_to_ray(rate_wad: u128) -> u128 {
    let rate_ray = wad_to_ray(rate_wad);
    let spy = SECONDS_PER_YEAR as u128;
    RAY + (rate_ray + spy / 2) / spy
}

/// Principal compounded at an annualized WAD rate over `elapsed_secs`.
pub fn compound(principal: u128, annual_rate_wad: u128, elapsed_secs: u64) -> u128 {
    if principal == 0 || elapsed_secs == 0 {
        return principal;
    }
    let factor = ray_pow(annual_rate_to_ray(annual_rate_wad), elapsed_secs);
    mul_div_half_up(principal, factor, RAY)
}

/// amount * price * WAD / 10^scale_exp with half-up rounding: normalizes a
/// token amount priced at some decimal scale into a WAD-scaled USD value.
/// the full triple product is carried at 256 bits.
pub fn usd_value(amount: u128, price: u128, scale_exp: u32) -> u128 {
    let denominator = 10u128.pow(scale_exp);
    let product = U256::from(amount) * U256::from(price) * U256::from(WAD)
        + U256::from(denominator / 2);
    let result = product / U256::from(denominator);
    debug_assert!(result <= U256::from(u128::MAX));
    result.as_u128()
}
