// src/interpreter.rs
//
// Classifies a framed line as a counter reading or invalid data.

/// Outcome of interpreting one line from the device
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParsedLine {
    /// A non-negative decimal counter value
    CounterValue(u32),
    /// Anything else: empty, signed, fractional, non-numeric or out of range
    Invalid,
}

/// Parse a line into a counter value.
///
/// Surrounding ASCII whitespace (including a trailing `\r`) is ignored. The
/// remainder must be one or more ASCII digits fitting in a `u32`; an explicit
/// `+` or `-` sign is rejected.
pub fn parse_line(line: &[u8]) -> ParsedLine {
    let trimmed = line.trim_ascii();
    if trimmed.is_empty() || !trimmed.iter().all(u8::is_ascii_digit) {
        return ParsedLine::Invalid;
    }

    // All-digit bytes are valid UTF-8; only overflow can fail here
    match std::str::from_utf8(trimmed).ok().and_then(|s| s.parse::<u32>().ok()) {
        Some(value) => ParsedLine::CounterValue(value),
        None => ParsedLine::Invalid,
    }
}
