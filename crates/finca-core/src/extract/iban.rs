//! Spanish IBAN validation and masking.

/// Validate a Spanish IBAN (ES + 22 digits) using the mod-97 checksum.
///
/// Algorithm:
/// 1. Move the first 4 characters to the end
/// 2. Replace letters with numbers (A=10, B=11, ..., Z=35)
/// 3. The resulting number mod 97 must equal 1
pub fn validate_spanish_iban(iban: &str) -> bool {
    let iban: String = iban
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();

    // Spanish IBAN: "ES" + 2 check digits + 20-digit BBAN.
    if iban.len() != 24 || !iban.starts_with("ES") {
        return false;
    }
    if !iban[2..].chars().all(|c| c.is_ascii_digit()) {
        return false;
    }

    let rearranged = format!("{}{}", &iban[4..], &iban[..4]);

    let mut number_str = String::new();
    for c in rearranged.chars() {
        if c.is_ascii_digit() {
            number_str.push(c);
        } else if c.is_ascii_alphabetic() {
            let value = (c as u32) - ('A' as u32) + 10;
            number_str.push_str(&value.to_string());
        } else {
            return false;
        }
    }

    mod97(&number_str) == 1
}

// Streaming remainder; the full number does not fit in u64.
fn mod97(number_str: &str) -> u32 {
    let mut remainder: u32 = 0;
    for c in number_str.chars() {
        let digit = c.to_digit(10).unwrap_or(0);
        remainder = (remainder * 10 + digit) % 97;
    }
    remainder
}

/// Mask an IBAN keeping the first 4 and last 4 characters. The unmasked
/// value must never be retained after extraction.
pub fn mask_iban(iban: &str) -> String {
    let cleaned: String = iban.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.len() < 8 {
        return "****".to_string();
    }
    format!("{}****{}", &cleaned[..4], &cleaned[cleaned.len() - 4..])
}
