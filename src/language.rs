use crate::models::Language;

const SINHALA_BLOCK: std::ops::RangeInclusive<char> = '\u{0D80}'..='\u{0DFF}';

/// Classify the dominant script by counting Sinhala code points against
/// ASCII letters. Empty or script-less text defaults to Sinhala.
pub fn detect_language(text: &str) -> Language {
    let (sinhala, latin) = text.chars().fold((0usize, 0usize), |(si, en), c| {
        if SINHALA_BLOCK.contains(&c) {
            (si + 1, en)
        } else if c.is_ascii_alphabetic() {
            (si, en + 1)
        } else {
            (si, en)
        }
    });

    match (sinhala, latin) {
        (0, 0) => Language::default(),
        (_, 0) => Language::Sinhala,
        (0, _) => Language::English,
        (si, en) if si > en => Language::Sinhala,
        _ => Language::English,
    }
}
