use sspa_utils::{u64_from_str, u8s_from_str};

#[test]
fn test_u8s_from_str_is_blake3() {
    assert_eq!(u8s_from_str("sspa"), *blake3::hash(b"sspa").as_bytes());
    assert_ne!(u8s_from_str("sspa"), u8s_from_str("sspa "));
}

#[test]
fn test_u64_from_str_folds_digest() {
    let digest = u8s_from_str("instance");
    let expected = digest
        .chunks_exact(8)
        .map(|c| u64::from_le_bytes(c.try_into().unwrap()))
        .fold(0u64, |acc, w| acc ^ w);
    assert_eq!(u64_from_str("instance"), expected);
    assert_eq!(u64_from_str("instance"), u64_from_str("instance"));
}
