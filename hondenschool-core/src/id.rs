//! Identifiers for records created locally.

use chrono::Utc;
use uuid::Uuid;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate an identifier like `les-3f9a1c7e-m5x2k0qz`.
///
/// Prefix, eight random hex characters, then the current time in milliseconds
/// in base 36. Collisions are not checked.
pub fn generate_id(prefix: &str) -> String {
    let random = Uuid::new_v4().simple().to_string();
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    format!("{}-{}-{}", prefix, &random[..8], to_base36(millis))
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_to_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1_295), "zz");
    }

    #[test]
    fn test_generate_id_shape() {
        let id = generate_id("les");
        let parts: Vec<_> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "les");
        assert_eq!(parts[1].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_id_is_unique_in_a_burst() {
        let ids: HashSet<_> = (0..1_000).map(|_| generate_id("x")).collect();
        assert_eq!(ids.len(), 1_000);
    }
}
