/// branch/alphabet.rs — Base complement and one-hot alphabets
///
/// The complement is the plain base-pairing table, applied position by
/// position without reversing the sequence:
///   A ↔ T   (adenine pairs with thymine)
///   C ↔ G   (cytosine pairs with guanine)
///   N ↔ N
/// Applying it twice gives back the input.

/// One-hot alphabet of the sequence branch.
pub const SEQUENCE_ALPHABET: &[char] = &['A', 'C', 'G', 'T', 'N'];

/// One-hot alphabet of folded structures (dot-bracket plus extensions).
pub const STRUCTURE_ALPHABET: &[char] = &['.', '|', 'x', '<', '>', '(', ')'];

/// Complement one base. Bytes outside the table pass through unchanged.
#[inline]
pub fn complement_base(b: u8) -> u8 {
    match b {
        b'A' => b'T',
        b'T' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        b'a' => b't',
        b't' => b'a',
        b'c' => b'g',
        b'g' => b'c',
        x => x,
    }
}

/// Complement every base of `seq`, keeping its orientation.
pub fn complement(seq: &str) -> String {
    seq.bytes().map(|b| complement_base(b) as char).collect()
}

/// One-hot vector of `symbol` in `alphabet` (case-insensitive).
pub fn one_hot(symbol: char, alphabet: &[char]) -> Option<Vec<f32>> {
    let idx = alphabet
        .iter()
        .position(|a| a.eq_ignore_ascii_case(&symbol))?;
    let mut v = vec![0.0f32; alphabet.len()];
    v[idx] = 1.0;
    Some(v)
}

/// One-hot encode a whole string; None if any symbol is outside `alphabet`.
pub fn one_hot_encode(text: &str, alphabet: &[char]) -> Option<Vec<Vec<f32>>> {
    text.chars().map(|c| one_hot(c, alphabet)).collect()
}
