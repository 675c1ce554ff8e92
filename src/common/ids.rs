//! Deterministic fingerprints for loaded artifacts.

const FNV_OFFSET: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// FNV-1a over the concatenation of `parts` (artifact, scaler, feature list),
/// rendered as 8 lowercase hex digits.
pub fn fingerprint<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> String {
    let hash = parts
        .into_iter()
        .flatten()
        .fold(FNV_OFFSET, |acc, b| (acc ^ u32::from(*b)).wrapping_mul(FNV_PRIME));
    format!("{hash:08x}")
}
