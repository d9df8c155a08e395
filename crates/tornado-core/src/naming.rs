//! Function name generation.

use rand::Rng;

/// Prefix of every generated function name.
pub const FUNCTION_NAME_PREFIX: &str = "TornadoComponent_";

const SUFFIX_LEN: usize = 6;
const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generate `TornadoComponent_` followed by six `[a-z0-9]` characters.
///
/// The suffix space is 36^6 (~2.2 billion names).
pub fn random_function_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!("{FUNCTION_NAME_PREFIX}{suffix}")
}
