pub fn u8s_from_str(input: &str) -> [u8; 32] {
    blake3::hash(input.as_bytes()).into()
}

/// Folds the blake3 digest of `input` into a single little-endian u64.
pub fn u64_from_str(input: &str) -> u64 {
    u8s_from_str(input)
        .chunks_exact(8)
        .map(|chunk| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(chunk);
            u64::from_le_bytes(bytes)
        })
        .fold(0, |acc, word| acc ^ word)
}
