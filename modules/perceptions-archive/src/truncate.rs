/// Text bounded to a character budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncated {
    pub text: String,
    pub truncated: bool,
    /// Character count before truncation. `None` when nothing was cut.
    pub original_length: Option<usize>,
}

/// Keep the first `max_chars` characters, exactly, and append a marker with the
/// original length. Counts Unicode scalar values, not bytes.
pub fn truncate(text: &str, max_chars: usize) -> Truncated {
    let cut = match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => byte_idx,
        None => {
            return Truncated {
                text: text.to_string(),
                truncated: false,
                original_length: None,
            }
        }
    };

    let original_length = text.chars().count();
    Truncated {
        text: format!(
            "{}... Remaining content truncated. Full length: {original_length} characters.",
            &text[..cut]
        ),
        truncated: true,
        original_length: Some(original_length),
    }
}
