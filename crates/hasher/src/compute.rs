use base64::{Engine, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha512};

/// The computation applied to each submitted input.
///
/// Implementations must be cheap to share across tasks and must always
/// terminate; the shutdown drain waits for every admitted computation.
pub trait Compute: Send + Sync + 'static {
    fn compute(&self, input: &str) -> String;
}

/// SHA-512 over the raw input bytes, encoded with standard padded base64.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha512Base64;

impl Compute for Sha512Base64 {
    fn compute(&self, input: &str) -> String {
        STANDARD.encode(Sha512::digest(input.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digests() {
        assert_eq!(
            Sha512Base64.compute("angryMonkey"),
            "ZEHhWB65gUlzdVwtDQArEyx+KVLzp/aTaRaPlBzYRIFj6vjFdqEb0Q5B8zVKCZ0vKbZPZklJz0Fd7su2A+gf7Q=="
        );
        assert_eq!(
            Sha512Base64.compute("password"),
            "sQnzu7wkTrgkQZF+0G1hi5AI3Qmzvv0bXgc5THBqi7mAsdd4Xll27ASbRt9fEyavWi6m0QP9B8lThf+rDKy8hg=="
        );
    }

    #[test]
    fn digest_is_88_base64_chars() {
        // 64 digest bytes encode to 88 characters including `==` padding.
        let digest = Sha512Base64.compute("a");
        assert_eq!(digest.len(), 88);
        assert!(digest.ends_with("=="));
    }
}
