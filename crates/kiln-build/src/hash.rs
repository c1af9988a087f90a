//! Content fingerprints for cache-busted file names.
//!
//! Uses blake3 so distinct contents never share a name in practice; a shared
//! name would serve stale content from the existing hashed file.

/// Hex characters kept from the digest.
pub const FINGERPRINT_LEN: usize = 10;

/// Deterministic short token for `data`.
pub fn fingerprint<T: AsRef<[u8]> + ?Sized>(data: &T) -> String {
    let hex = blake3::hash(data.as_ref()).to_hex();
    hex.as_str()[..FINGERPRINT_LEN].to_string()
}

/// Insert `token` before the last extension of `name`.
///
/// `style.css` becomes `style.<token>.css`; a name without extension gets the
/// token appended.
pub fn hashed_file_name(name: &str, token: &str) -> String {
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}.{}{}", &name[..dot], token, &name[dot..]),
        _ => format!("{name}.{token}"),
    }
}
