//! Supported content locales and answer-locale resolution.
//!
//! The answer locale is resolved from the question text itself when it
//! carries a recognizable signal (script or common words), falling back to
//! the caller's site-locale preference, and finally to English. Detection is
//! checked in a fixed priority order: Russian (Cyrillic script), Turkish,
//! then German. Which locale's *content* gets retrieved is decided
//! separately by the orchestrator.

use serde::{Deserialize, Serialize};

/// The fixed set of locales the CMS publishes content in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    Tr,
    De,
    Ru,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Tr => "tr",
            Locale::De => "de",
            Locale::Ru => "ru",
        }
    }

    pub fn from_code(code: &str) -> Option<Locale> {
        match code.trim().to_lowercase().as_str() {
            "en" => Some(Locale::En),
            "tr" => Some(Locale::Tr),
            "de" => Some(Locale::De),
            "ru" => Some(Locale::Ru),
            _ => None,
        }
    }

    /// English name of the language, used when instructing the model.
    pub fn language_name(&self) -> &'static str {
        match self {
            Locale::En => "English",
            Locale::Tr => "Turkish",
            Locale::De => "German",
            Locale::Ru => "Russian",
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common short words that strongly indicate the question's language.
const TR_WORDS: &[&str] = &[
    "merhaba", "nasıl", "nerede", "fiyat", "oda", "var", "mı", "müsait", "teşekkür", "rezervasyon",
];
const DE_WORDS: &[&str] = &[
    "hallo", "zimmer", "gibt", "haben", "danke", "bitte", "wie", "wo", "preis", "frühstück",
];

/// Inspect the question text for a locale signal.
///
/// Returns `None` when nothing recognizable is found. The checks run in
/// priority order; Turkish is checked before German because the
/// Turkish-specific letters (ğ, ı, ş) are unambiguous while ö/ü are shared.
pub fn detect_locale(question: &str) -> Option<Locale> {
    if question.chars().any(|c| ('\u{0400}'..='\u{04FF}').contains(&c)) {
        return Some(Locale::Ru);
    }

    let lower = question.to_lowercase();
    let words: Vec<&str> = lower
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .collect();

    if lower.chars().any(|c| matches!(c, 'ğ' | 'ı' | 'ş'))
        || words.iter().any(|w| TR_WORDS.contains(w))
    {
        return Some(Locale::Tr);
    }

    if lower.chars().any(|c| matches!(c, 'ä' | 'ö' | 'ü' | 'ß'))
        || words.iter().any(|w| DE_WORDS.contains(w))
    {
        return Some(Locale::De);
    }

    None
}

/// Resolve the locale the answer should be written in.
///
/// Question signal wins over the caller's site-locale preference; with
/// neither, the baseline is English.
pub fn resolve_answer_locale(question: &str, site_locale: Option<Locale>) -> Locale {
    detect_locale(question)
        .or(site_locale)
        .unwrap_or(Locale::En)
}

/// Fixed response used when retrieval produced no usable evidence.
pub fn no_context_message(locale: Locale) -> &'static str {
    match locale {
        Locale::En => {
            "I couldn't find anything about that on our site. Please reach us through the contact page and we'll be happy to help."
        }
        Locale::Tr => {
            "Sitemizde bu konuyla ilgili bir bilgi bulamadım. Lütfen iletişim sayfamızdan bize ulaşın, size memnuniyetle yardımcı oluruz."
        }
        Locale::De => {
            "Dazu konnte ich auf unserer Seite leider nichts finden. Bitte kontaktieren Sie uns über die Kontaktseite, wir helfen Ihnen gerne weiter."
        }
        Locale::Ru => {
            "Я не нашёл информации об этом на нашем сайте. Пожалуйста, свяжитесь с нами через страницу контактов, и мы с радостью поможем."
        }
    }
}

/// Fixed apology used when generation failed after the fallback tier.
pub fn apology_message(locale: Locale) -> &'static str {
    match locale {
        Locale::En => {
            "Sorry, I can't answer right now. Please try again in a moment or reach us through the contact page."
        }
        Locale::Tr => {
            "Üzgünüm, şu anda yanıt veremiyorum. Lütfen birazdan tekrar deneyin veya iletişim sayfamızdan bize ulaşın."
        }
        Locale::De => {
            "Entschuldigung, ich kann gerade nicht antworten. Bitte versuchen Sie es gleich noch einmal oder nutzen Sie unsere Kontaktseite."
        }
        Locale::Ru => {
            "Извините, сейчас я не могу ответить. Пожалуйста, попробуйте ещё раз чуть позже или свяжитесь с нами через страницу контактов."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turkish_signal_overrides_site_locale() {
        let resolved = resolve_answer_locale("Merhaba, nasılsınız?", Some(Locale::En));
        assert_eq!(resolved, Locale::Tr);
    }

    #[test]
    fn test_no_signal_uses_site_locale() {
        let resolved = resolve_answer_locale("What rooms do you offer?", Some(Locale::De));
        assert_eq!(resolved, Locale::De);
    }

    #[test]
    fn test_no_signal_no_site_locale_is_english() {
        let resolved = resolve_answer_locale("What rooms do you offer?", None);
        assert_eq!(resolved, Locale::En);
    }

    #[test]
    fn test_cyrillic_detected_as_russian() {
        assert_eq!(detect_locale("Есть ли свободные номера?"), Some(Locale::Ru));
    }

    #[test]
    fn test_german_umlauts_and_words() {
        assert_eq!(detect_locale("Gibt es ein Frühstück?"), Some(Locale::De));
        assert_eq!(detect_locale("Straße zum Hotel?"), Some(Locale::De));
        // ö/ü alone are a German signal once the Turkish checks pass.
        assert_eq!(detect_locale("Können wir früh einchecken?"), Some(Locale::De));
    }

    #[test]
    fn test_turkish_checked_before_german() {
        // ü alone is ambiguous; the Turkish word list should win here.
        assert_eq!(detect_locale("Oda müsait mi?"), Some(Locale::Tr));
    }

    #[test]
    fn test_locale_codes_roundtrip() {
        for locale in [Locale::En, Locale::Tr, Locale::De, Locale::Ru] {
            assert_eq!(Locale::from_code(locale.as_str()), Some(locale));
        }
        assert_eq!(Locale::from_code("fr"), None);
    }
}
