use crate::error::ExecError;

/// Language name to backend language id.
const LANGUAGES: &[(&str, i32)] = &[
    ("c", 50),
    ("cpp", 54),
    ("go", 60),
    ("java", 62),
    ("javascript", 63),
    ("python", 71),
    ("rust", 73),
];

/// Resolve a language name (case-insensitive) to the backend's numeric id.
pub fn language_id(name: &str) -> Result<i32, ExecError> {
    let wanted = name.trim().to_ascii_lowercase();
    LANGUAGES
        .iter()
        .find(|(lang, _)| *lang == wanted)
        .map(|(_, id)| *id)
        .ok_or_else(|| ExecError::UnsupportedLanguage(name.to_string()))
}

pub fn supported_languages() -> impl Iterator<Item = &'static str> {
    LANGUAGES.iter().map(|(lang, _)| *lang)
}
