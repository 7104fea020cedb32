//! Validation utilities for the farm dashboard
//!
//! Includes Chile-specific validations for partner and client records.

use rust_decimal::Decimal;

// ============================================================================
// Farm Record Validations
// ============================================================================

/// Validate that a money amount or quantity is strictly positive
pub fn validate_positive_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount <= Decimal::ZERO {
        return Err("Amount must be greater than zero");
    }
    Ok(())
}

/// Longest calibre label accepted by the harvest forms
pub const MAX_CALIBRE_LEN: usize = 40;

/// Validate a calibre label (size grade of harvested fruit)
pub fn validate_calibre(calibre: &str) -> Result<(), &'static str> {
    let trimmed = calibre.trim();
    if trimmed.is_empty() {
        return Err("Calibre cannot be empty");
    }
    if trimmed.chars().count() > MAX_CALIBRE_LEN {
        return Err("Calibre must be at most 40 characters");
    }
    Ok(())
}

/// Validate an irrigation shift duration in minutes (at most one day)
pub fn validate_shift_duration(minutes: u32) -> Result<(), &'static str> {
    if minutes == 0 {
        return Err("Shift duration must be at least 1 minute");
    }
    if minutes > 1440 {
        return Err("Shift duration cannot exceed 1440 minutes");
    }
    Ok(())
}

// ============================================================================
// Chile-Specific Validations
// ============================================================================

/// Compute the RUT verifier for a numeric body (modulo 11, weights 2..=7)
pub fn rut_check_digit(body: u64) -> char {
    let mut sum = 0;
    let mut weight = 2;
    let mut rest = body;
    while rest > 0 {
        sum += (rest % 10) * weight;
        rest /= 10;
        weight = if weight == 7 { 2 } else { weight + 1 };
    }
    match 11 - (sum % 11) {
        11 => '0',
        10 => 'K',
        d => char::from_digit(d as u32, 10).unwrap_or('0'),
    }
}

/// Validate a Chilean RUT (Rol Único Tributario)
/// Accepts: 12.345.678-5, 12345678-5, 123456785, 7.654.321-K
pub fn validate_rut(rut: &str) -> Result<(), &'static str> {
    let cleaned: String = rut
        .chars()
        .filter(|c| !matches!(c, '.' | '-' | ' '))
        .collect::<String>()
        .to_ascii_uppercase();

    if cleaned.len() < 2 {
        return Err("RUT is too short");
    }
    let (body, verifier) = cleaned.split_at(cleaned.len() - 1);
    if body.len() > 9 || !body.chars().all(|c| c.is_ascii_digit()) {
        return Err("Invalid RUT format");
    }
    let body: u64 = body.parse().map_err(|_| "Invalid RUT format")?;
    if body == 0 {
        return Err("Invalid RUT format");
    }

    let expected = rut_check_digit(body);
    if verifier.chars().next() != Some(expected) {
        return Err("Invalid RUT check digit");
    }
    Ok(())
}
