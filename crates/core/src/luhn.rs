//! Luhn (mod 10) checksum used for order numbers and withdrawal references.

/// Returns `true` when `number` is a non-empty string of ASCII digits whose
/// Luhn checksum is zero.
pub fn is_valid(number: &str) -> bool {
    if number.is_empty() {
        return false;
    }

    let mut sum = 0u32;
    for (idx, ch) in number.bytes().rev().enumerate() {
        if !ch.is_ascii_digit() {
            return false;
        }

        let mut digit = u32::from(ch - b'0');
        if idx % 2 == 1 {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }

    sum % 10 == 0
}

/// Compute the check digit that makes `payload` + digit Luhn-valid.
///
/// Returns `None` if `payload` contains non-digits.
pub fn check_digit(payload: &str) -> Option<u8> {
    let mut sum = 0u32;
    for (idx, ch) in payload.bytes().rev().enumerate() {
        if !ch.is_ascii_digit() {
            return None;
        }

        // Positions shift by one once the check digit is appended.
        let mut digit = u32::from(ch - b'0');
        if idx % 2 == 0 {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }

    Some(((10 - sum % 10) % 10) as u8)
}
