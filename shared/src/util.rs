/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Spreadsheet-style letters for a zero-based row index (0 → "A", 25 → "Z", 26 → "AA")
pub fn row_letters(row: u32) -> String {
    let mut n = row as u64 + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        out.push(b'A' + rem);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Human cell label for a position: row letters followed by the one-based column ("B3")
pub fn cell_label(row: u32, col: u32) -> String {
    format!("{}{}", row_letters(row), col + 1)
}
