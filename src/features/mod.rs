pub mod lang;
pub mod start;

use crate::store::Language;

/// Fixed user-facing strings for one language
pub struct Texts {
    pub start_welcome: &'static str,
    pub start_instructions: &'static str,
    pub lang_title: &'static str,
    pub lang_selected: &'static str,
    pub lang_error: &'static str,
}

const ENGLISH: Texts = Texts {
    start_welcome: "👋 Hi! Send me a link and I'll take care of the rest.",
    start_instructions: "Use /lang to choose the language I answer in.",
    lang_title: "<b>Choose your language</b>",
    lang_selected: "✅ Language set to English.",
    lang_error: "❌ Failed to change the language. Please try again later.",
};

const UKRAINIAN: Texts = Texts {
    start_welcome: "👋 Привіт! Надішли мені посилання, а решту я зроблю сам.",
    start_instructions: "Використовуй /lang, щоб обрати мову відповідей.",
    lang_title: "<b>Оберіть мову</b>",
    lang_selected: "✅ Мову змінено на українську.",
    lang_error: "❌ Не вдалося змінити мову. Спробуйте пізніше.",
};

const RUSSIAN: Texts = Texts {
    start_welcome: "👋 Привет! Пришли мне ссылку, а остальное я сделаю сам.",
    start_instructions: "Используй /lang, чтобы выбрать язык ответов.",
    lang_title: "<b>Выберите язык</b>",
    lang_selected: "✅ Язык изменён на русский.",
    lang_error: "❌ Не удалось изменить язык. Попробуйте позже.",
};

pub fn texts(language: Language) -> &'static Texts {
    match language {
        Language::English => &ENGLISH,
        Language::Ukrainian => &UKRAINIAN,
        Language::Russian => &RUSSIAN,
    }
}

pub fn language_label(language: Language) -> &'static str {
    match language {
        Language::English => "🇬🇧 English",
        Language::Ukrainian => "🇺🇦 Українська",
        Language::Russian => "🇷🇺 Русский",
    }
}
