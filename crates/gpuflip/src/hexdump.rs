use core::fmt::Write as _;

const BYTES_PER_ROW: usize = 32;

/// Format up to `limit` leading bytes as `label` followed by rows of 32 hex bytes.
pub fn hex_preview(label: &str, bytes: &[u8], limit: usize) -> String {
    let shown = &bytes[..bytes.len().min(limit)];
    let mut out = String::with_capacity(label.len() + 1 + shown.len() * 3 + shown.len() / 32 + 1);
    out.push_str(label);
    out.push('\n');
    for (row, chunk) in shown.chunks(BYTES_PER_ROW).enumerate() {
        if row > 0 {
            out.push('\n');
        }
        for (i, byte) in chunk.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            let _ = write!(out, "{byte:02x}");
        }
    }
    if shown.len() < bytes.len() {
        let _ = write!(out, "\n... ({} more bytes)", bytes.len() - shown.len());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_of_thirty_two() {
        let bytes: Vec<u8> = (0..40).collect();
        let text = hex_preview("buf", &bytes, 64);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "buf");
        assert!(lines[1].starts_with("00 01 02"));
        assert!(lines[1].ends_with("1e 1f"));
        assert_eq!(lines[2], "20 21 22 23 24 25 26 27");
    }

    #[test]
    fn truncation_is_noted() {
        let text = hex_preview("buf", &[0xAA; 10], 4);
        assert_eq!(text, "buf\naa aa aa aa\n... (6 more bytes)");
    }

    #[test]
    fn empty_input() {
        assert_eq!(hex_preview("empty", &[], 16), "empty\n");
    }
}
