pub fn mask_pii(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }
    let len = trimmed.chars().count();
    format!("<redacted len={}>", len)
}

/// Keeps the last two digits so operators can still tell callers apart in logs.
pub fn mask_phone(value: &str) -> String {
    let digits: Vec<char> = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return mask_pii(value);
    }
    let tail: String = digits[digits.len() - 2..].iter().collect();
    format!("<phone ***{}>", tail)
}

fn is_emoji(c: char) -> bool {
    matches!(
        c as u32,
        0x1F600..=0x1F64F
            | 0x1F300..=0x1F5FF
            | 0x1F680..=0x1F6FF
            | 0x1F1E0..=0x1F1FF
            | 0x2600..=0x26FF
            | 0x2700..=0x27BF
    )
}

/// Drops emoji/pictograph code points TTS engines would read out or choke on,
/// then collapses whitespace runs.
pub fn strip_emojis(text: &str) -> String {
    let filtered: String = text.chars().filter(|c| !is_emoji(*c)).collect();
    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}
