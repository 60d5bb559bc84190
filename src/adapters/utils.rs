//! Shared helpers for adapter-layer validation.

/// Returns `true` if every byte of `s` is in the printable ASCII range
/// `0x20..=0x7E` (space through tilde, inclusive).
///
/// Used for SSIDs and MQTT broker host names.
pub(super) fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}
