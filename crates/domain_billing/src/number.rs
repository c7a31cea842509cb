//! Bill number generation
//!
//! Numbers read `<initials><ddMMyy>-<suffix>`: the first letters of the
//! customer's first two name tokens (`X` where missing), the issue date, and
//! a 4-character uppercase alphanumeric suffix. Uniqueness is ultimately
//! enforced by the bill record store.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

const SUFFIX_LEN: usize = 4;
const PLACEHOLDER_INITIAL: &str = "X";

/// Source of human-facing bill numbers
pub trait BillNumberGenerator: Send + Sync {
    fn generate(&self, customer_name: Option<&str>, issued_at: DateTime<Utc>) -> String;
}

/// Two-letter prefix from the first two space-separated name tokens
pub fn customer_initials(customer_name: Option<&str>) -> String {
    let Some(name) = customer_name else {
        return PLACEHOLDER_INITIAL.repeat(2);
    };
    let mut tokens = name.trim_end().split(' ');
    let initial = |token: Option<&str>| -> String {
        token
            .and_then(|t| t.chars().next())
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_else(|| PLACEHOLDER_INITIAL.to_string())
    };
    let first = initial(tokens.next());
    let second = initial(tokens.next());
    format!("{first}{second}")
}

pub fn format_bill_number(customer_name: Option<&str>, issued_at: DateTime<Utc>, suffix: &str) -> String {
    format!(
        "{}{}-{}",
        customer_initials(customer_name),
        issued_at.format("%d%m%y"),
        suffix
    )
}

/// Random suffix taken from a v4 UUID
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidBillNumberGenerator;

impl BillNumberGenerator for UuidBillNumberGenerator {
    fn generate(&self, customer_name: Option<&str>, issued_at: DateTime<Utc>) -> String {
        let suffix: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .take(SUFFIX_LEN)
            .collect::<String>()
            .to_ascii_uppercase();
        format_bill_number(customer_name, issued_at, &suffix)
    }
}

/// Deterministic base-36 counter suffix, wrapping after `ZZZZ`
#[derive(Debug, Default)]
pub struct SequenceBillNumberGenerator {
    next: AtomicU64,
}

impl SequenceBillNumberGenerator {
    const MODULUS: u64 = 36u64.pow(SUFFIX_LEN as u32);

    pub fn new() -> Self {
        Self::starting_at(0)
    }

    pub fn starting_at(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }

    fn encode(mut value: u64) -> String {
        const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
        let mut buf = [b'0'; SUFFIX_LEN];
        for slot in buf.iter_mut().rev() {
            *slot = DIGITS[(value % 36) as usize];
            value /= 36;
        }
        buf.iter().map(|&b| b as char).collect()
    }
}

impl BillNumberGenerator for SequenceBillNumberGenerator {
    fn generate(&self, customer_name: Option<&str>, issued_at: DateTime<Utc>) -> String {
        let value = self.next.fetch_add(1, Ordering::Relaxed) % Self::MODULUS;
        format_bill_number(customer_name, issued_at, &Self::encode(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn new_year() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_initials() {
        assert_eq!(customer_initials(Some("alice doe")), "AD");
        assert_eq!(customer_initials(Some("Cher")), "CX");
        assert_eq!(customer_initials(Some("")), "XX");
        assert_eq!(customer_initials(None), "XX");
        assert_eq!(customer_initials(Some("Mary Ann Smith")), "MA");
    }

    #[test]
    fn test_uuid_generator_format() {
        let number = UuidBillNumberGenerator.generate(Some("Alice Doe"), new_year());
        assert!(number.starts_with("AD010124-"));
        let suffix = &number["AD010124-".len()..];
        assert_eq!(suffix.len(), 4);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_sequence_generator() {
        let generator = SequenceBillNumberGenerator::starting_at(35);
        assert_eq!(generator.generate(Some("Alice Doe"), new_year()), "AD010124-000Z");
        assert_eq!(generator.generate(None, new_year()), "XX010124-0010");
    }

    #[test]
    fn test_sequence_wraps() {
        let generator = SequenceBillNumberGenerator::starting_at(36u64.pow(4) - 1);
        assert_eq!(generator.generate(None, new_year()), "XX010124-ZZZZ");
        assert_eq!(generator.generate(None, new_year()), "XX010124-0000");
    }
}
