//! Server name generation.

use rand::RngCore;

/// Source of fresh, unique server names.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// 128 random bits rendered as 32 lowercase hex characters.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomNameGenerator;

impl IdGenerator for RandomNameGenerator {
    fn next_id(&self) -> String {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_names() {
        let generator = RandomNameGenerator;
        let a = generator.next_id();
        let b = generator.next_id();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_no_fixed_nibbles() {
        let generator = RandomNameGenerator;
        let names: Vec<String> = (0..200).map(|_| generator.next_id()).collect();
        // A v4 UUID pins position 12 to '4' and position 16 to 8..=b.
        assert!(names.iter().any(|n| &n[12..13] != "4"));
        assert!(names.iter().any(|n| !"89ab".contains(&n[16..17])));
    }
}
