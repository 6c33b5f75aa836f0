/// Creation timestamp for new stories, ISO-8601 with milliseconds
/// (what `Date.toISOString()` produces). Uses the browser clock.
pub(crate) fn now_iso() -> String {
    js_sys::Date::new_0().to_iso_string().into()
}

/// UUIDv4-shaped id for locally created stories.
pub(crate) fn new_story_id() -> String {
    let mut bytes = [0u8; 16];
    if getrandom::getrandom(&mut bytes).is_err() {
        // No crypto source (ancient or locked-down runtime). Creation must
        // still work, so fall back to the clock for some uniqueness.
        let ms = js_sys::Date::now().to_bits();
        bytes[..8].copy_from_slice(&ms.to_le_bytes());
    }

    // RFC 4122 version and variant bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    let mut out = String::with_capacity(36);
    for (i, b) in bytes.iter().enumerate() {
        if matches!(i, 4 | 6 | 8 | 10) {
            out.push('-');
        }
        out.push_str(&format!("{:02x}", b));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_story_id_is_uuid_v4_shaped() {
        let id = new_story_id();
        assert_eq!(id.len(), 36);

        let dash_positions: Vec<usize> = id
            .char_indices()
            .filter(|(_, c)| *c == '-')
            .map(|(i, _)| i)
            .collect();
        assert_eq!(dash_positions, vec![8, 13, 18, 23]);

        // Version nibble is 4, variant nibble is one of 8/9/a/b.
        assert_eq!(&id[14..15], "4");
        assert!(matches!(&id[19..20], "8" | "9" | "a" | "b"));
    }

    #[test]
    fn test_new_story_id_is_unique() {
        assert_ne!(new_story_id(), new_story_id());
    }
}
