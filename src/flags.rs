const FLAG_NAMES: [(u32, &str); 8] = [
    (0x1, "public"),
    (0x2, "private"),
    (0x4, "protected"),
    (0x8, "static"),
    (0x10, "final"),
    (0x400, "abstract"),
    (0x1000, "synthetic"),
    (0x20000, "interface"),
];

/// Renders access flags as space-separated keywords, `"unknown"` if none
/// of the listed bits are set.
pub fn access_flags_to_string(access_flags: u32) -> String {
    let flags: Vec<_> = FLAG_NAMES
        .iter()
        .filter(|(bit, _)| access_flags & bit != 0)
        .map(|(_, name)| *name)
        .collect();
    if flags.is_empty() {
        "unknown".to_string()
    } else {
        flags.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::access_flags_to_string;

    #[test]
    fn test_each_bit() {
        let expected = [
            (0x1, "public"),
            (0x2, "private"),
            (0x4, "protected"),
            (0x8, "static"),
            (0x10, "final"),
            (0x400, "abstract"),
            (0x1000, "synthetic"),
            (0x20000, "interface"),
        ];
        for (bit, name) in expected {
            assert_eq!(access_flags_to_string(bit), name, "bit {bit:#x}");
        }
    }

    #[test]
    fn test_combined_bits_keep_table_order() {
        assert_eq!(access_flags_to_string(0x19), "public static final");
        assert_eq!(access_flags_to_string(0x1001 | 0x400), "public abstract synthetic");
    }

    #[test]
    fn test_unlisted_bits() {
        assert_eq!(access_flags_to_string(0), "unknown");
        // ACC_INTERFACE in the DEX format is 0x200, which has no keyword here
        assert_eq!(access_flags_to_string(0x200), "unknown");
        assert_eq!(access_flags_to_string(0x201), "public");
    }
}
