// src/normalize/language.rs

//! Best-effort language detection.

use whatlang::Lang;

pub const DEFAULT_LANGUAGE: &str = "en";

/// ISO 639-1 code of the body text, `en` when detection is unreliable.
pub fn detect_language(text: &str) -> String {
    whatlang::detect(text)
        .filter(|info| info.is_reliable())
        .and_then(|info| iso639_1(info.lang()))
        .unwrap_or(DEFAULT_LANGUAGE)
        .to_string()
}

fn iso639_1(lang: Lang) -> Option<&'static str> {
    let code = match lang {
        Lang::Eng => "en",
        Lang::Deu => "de",
        Lang::Fra => "fr",
        Lang::Spa => "es",
        Lang::Ita => "it",
        Lang::Por => "pt",
        Lang::Nld => "nl",
        Lang::Swe => "sv",
        Lang::Dan => "da",
        Lang::Nob => "no",
        Lang::Fin => "fi",
        Lang::Pol => "pl",
        Lang::Ces => "cs",
        Lang::Rus => "ru",
        Lang::Ukr => "uk",
        Lang::Tur => "tr",
        Lang::Jpn => "ja",
        Lang::Kor => "ko",
        Lang::Cmn => "zh",
        Lang::Ara => "ar",
        Lang::Hin => "hi",
        _ => return None,
    };
    Some(code)
}
