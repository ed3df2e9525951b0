//! Language detection seam.

use std::sync::OnceLock;

use whatlang::{Detector, Lang};

/// Detects the language of a text as a lower-case ISO-639-1 code.
///
/// `None` means detection failed (no script or trigram signal). Callers must
/// treat that as a pass, never as a block.
pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> Option<String>;
}

/// [`LanguageDetector`] backed by `whatlang` trigram detection, restricted to
/// the languages a filter can name. The top guess is returned as-is.
#[derive(Clone, Copy, Debug, Default)]
pub struct WhatlangDetector;

const ALLOWED: [(Lang, &str); 11] = [
    (Lang::Eng, "en"),
    (Lang::Pes, "fa"),
    (Lang::Ara, "ar"),
    (Lang::Fra, "fr"),
    (Lang::Deu, "de"),
    (Lang::Spa, "es"),
    (Lang::Ita, "it"),
    (Lang::Rus, "ru"),
    (Lang::Cmn, "zh"),
    (Lang::Jpn, "ja"),
    (Lang::Kor, "ko"),
];

fn detector() -> &'static Detector {
    static DETECTOR: OnceLock<Detector> = OnceLock::new();
    DETECTOR.get_or_init(|| {
        Detector::with_allowlist(ALLOWED.iter().map(|(lang, _)| *lang).collect())
    })
}

fn two_letter(lang: Lang) -> Option<&'static str> {
    ALLOWED.iter().find(|(l, _)| *l == lang).map(|(_, code)| *code)
}

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Option<String> {
        let info = detector().detect(text)?;
        two_letter(info.lang()).map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::SUPPORTED_LANGUAGES;

    #[test]
    fn every_supported_language_has_a_whatlang_mapping() {
        for code in SUPPORTED_LANGUAGES {
            assert!(ALLOWED.iter().any(|(_, c)| *c == code), "{code} is not mapped");
        }
        assert_eq!(two_letter(Lang::Ara), Some("ar"));
        assert_eq!(Lang::Ara.code(), "ara");
        assert_eq!(two_letter(Lang::Por), None);
    }

    #[test]
    fn detects_a_sample_of_each_supported_language() {
        let samples = [
            ("en", "The weather is lovely today, so we are all going to walk to the park after lunch."),
            ("fa", "امروز صبح با دوستانم به پارک رفتیم و آنجا چای نوشیدیم و درباره کارهای هفته بعد گپ زدیم."),
            ("ar", "ذهب الأولاد إلى المدرسة في الصباح الباكر وكانوا سعداء جدا بلقاء أصدقائهم والمعلمين."),
            ("fr", "Nous sommes allés au marché ce matin pour acheter des légumes frais et du pain chaud."),
            ("de", "Wir sind heute Morgen mit dem Fahrrad zur Arbeit gefahren, weil das Wetter so schön war."),
            ("es", "Esta mañana fuimos al mercado para comprar frutas frescas y después tomamos un café juntos."),
            ("it", "Questa mattina siamo andati al mercato per comprare la frutta e poi abbiamo preso un caffè."),
            ("ru", "Сегодня утром мы пошли в парк, чтобы погулять с собакой и посмотреть на осенние деревья."),
            ("zh", "我们今天下午去公园散步，天气非常好，很多人在那里放风筝和聊天。"),
            ("ja", "今日は天気がとても良いので、友達と一緒に公園へ散歩に行きました。"),
            ("ko", "오늘은 날씨가 아주 좋아서 친구들과 함께 공원에 산책을 갔습니다."),
        ];
        assert_eq!(samples.len(), SUPPORTED_LANGUAGES.len());
        for (expected, text) in samples {
            assert_eq!(WhatlangDetector.detect(text).as_deref(), Some(expected), "sample: {text}");
        }
    }

    #[test]
    fn chat_length_english_is_still_detected() {
        assert_eq!(
            WhatlangDetector.detect("Hello everyone, how are you today?").as_deref(),
            Some("en")
        );
        let guess = WhatlangDetector.detect("I think the market will crash tomorrow");
        assert!(guess.is_some());
        assert_ne!(guess.as_deref(), Some("fa"));
    }

    #[test]
    fn text_without_letters_is_a_detection_failure() {
        assert_eq!(WhatlangDetector.detect("12345 67890 !!!"), None);
    }
}
