use crate::utils::constants::{COUNTY_FIPS_WIDTH, STATE_FIPS_WIDTH, ZIP_WIDTH};

/// Normalize a ZIP code to 5 zero-padded digits.
///
/// Accepts values that went through a numeric column (`501`, `"501.0"`),
/// ZIP+4 codes (`"02134-1234"`) and Redfin region labels
/// (`"Zip Code: 77622"`). Returns `None` for anything else.
///
/// # Examples
/// ```
/// use redfin_geo_processor::utils::normalize_zip;
///
/// assert_eq!(normalize_zip("501").as_deref(), Some("00501"));
/// assert_eq!(normalize_zip("Zip Code: 77622").as_deref(), Some("77622"));
/// assert_eq!(normalize_zip("ABCDE"), None);
/// ```
pub fn normalize_zip(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("Zip Code:")
        .map(str::trim)
        .unwrap_or(trimmed);

    // ZIP+4
    let base = trimmed.split('-').next().unwrap_or(trimmed);
    pad_digits(strip_float_suffix(base), ZIP_WIDTH)
}

/// Normalize a county FIPS code to 5 zero-padded digits.
pub fn normalize_county_fips(raw: &str) -> Option<String> {
    pad_digits(strip_float_suffix(raw.trim()), COUNTY_FIPS_WIDTH)
}

/// State FIPS code (first two digits of a normalized county FIPS code).
pub fn state_fips_from_county(county_fips: &str) -> Option<String> {
    if county_fips.len() == COUNTY_FIPS_WIDTH {
        Some(county_fips[..STATE_FIPS_WIDTH].to_string())
    } else {
        None
    }
}

/// Normalize a CBSA code (5 digits, e.g. `35620` for New York-Newark-Jersey City).
pub fn normalize_cbsa(raw: &str) -> Option<String> {
    pad_digits(strip_float_suffix(raw.trim()), 5)
}

fn strip_float_suffix(value: &str) -> &str {
    match value.split_once('.') {
        Some((int_part, frac)) if !frac.is_empty() && frac.chars().all(|c| c == '0') => int_part,
        _ => value,
    }
}

fn pad_digits(value: &str, width: usize) -> Option<String> {
    if value.is_empty() || value.len() > width || !value.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(format!("{:0>width$}", value, width = width))
}
