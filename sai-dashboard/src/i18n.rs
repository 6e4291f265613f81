//! Localisation of the few strings the dashboard generates itself

use std::collections::HashMap;

/// Catalogues the dashboard ships
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    Japanese,
    TraditionalChinese,
    SimplifiedChinese,
}

impl Language {
    /// Picks a catalogue from an Accept-Language style list
    ///
    /// The first recognised tag wins; quality values are ignored. Returns
    /// `None` if no tag is recognised.
    pub fn from_accept(alang: &str) -> Option<Self> {
        alang.split(',').find_map(|entry| {
            let tag = entry.split(';').next().unwrap_or("").trim();
            match tag {
                "ja" => Some(Language::Japanese),
                "zh_TW" | "zh_HK" | "zh_SG" | "zh_HANT" | "zh-TW" | "zh-HK" | "zh-SG"
                | "zh-HANT" => Some(Language::TraditionalChinese),
                "zh" | "zh_CN" | "zh_HANS" | "zh-CN" | "zh-HANS" => {
                    Some(Language::SimplifiedChinese)
                }
                "en" | "en_US" | "en-US" => Some(Language::English),
                _ => None,
            }
        })
    }

    fn catalogue(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Language::English => &[],
            Language::Japanese => JA,
            Language::TraditionalChinese => ZH_HANT,
            Language::SimplifiedChinese => ZH_HANS,
        }
    }
}

const JA: &[(&str, &str)] = &[
    ("s", "秒"),
    ("m", "分"),
    ("h", "時間"),
    (" days", "日々"),
    (" weeks", "週"),
    (" months", "数ヶ月"),
    (" years", "年"),
    ("Branch", "ブランチ"),
    ("Tag", "タグ"),
    ("created", "作成した"),
    ("ago", "前"),
    ("Download", "ダウンロード"),
];

const ZH_HANT: &[(&str, &str)] = &[
    ("s", "秒"),
    ("m", "分鐘"),
    ("h", "小時"),
    (" days", "天"),
    (" weeks", "週"),
    (" months", "個月"),
    (" years", "年份"),
    ("Branch", "科"),
    ("Tag", "標籤"),
    ("created", "創建"),
    ("ago", "前"),
    ("Download", "下載"),
];

const ZH_HANS: &[(&str, &str)] = &[
    ("s", "秒"),
    ("m", "分钟"),
    ("h", "小时"),
    (" days", "天"),
    (" weeks", "周"),
    (" months", "个月"),
    (" years", "年份"),
    ("Branch", "科"),
    ("Tag", "标签"),
    ("created", "创建"),
    ("ago", "前"),
    ("Download", "下载"),
];

/// Key to text lookup with `%{name}` parameter substitution
///
/// Keys without a translation come back as themselves, formatted.
#[derive(Debug, Clone, Default)]
pub struct Translator {
    language: Language,
    values: HashMap<&'static str, &'static str>,
}

impl Translator {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            values: language.catalogue().iter().copied().collect(),
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn translate(&self, key: &str, params: &[(&str, &str)]) -> String {
        let text = self.values.get(key).copied().unwrap_or(key);
        params.iter().fold(text.to_string(), |acc, (name, value)| {
            acc.replace(&format!("%{{{name}}}"), value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_recognised_language_wins() {
        assert_eq!(
            Language::from_accept("fr-FR,zh-TW;q=0.8,ja;q=0.5"),
            Some(Language::TraditionalChinese)
        );
        assert_eq!(Language::from_accept("en-US,ja"), Some(Language::English));
        assert_eq!(Language::from_accept("de,fr"), None);
    }

    #[test]
    fn test_translate_falls_back_to_key() {
        let tr = Translator::new(Language::Japanese);
        assert_eq!(tr.translate("h", &[]), "時間");
        assert_eq!(tr.translate("unknown", &[]), "unknown");
    }

    #[test]
    fn test_parameter_substitution() {
        let tr = Translator::default();
        assert_eq!(
            tr.translate("%{n} builds by %{who}, %{n} total", &[("n", "3"), ("who", "ci")]),
            "3 builds by ci, 3 total"
        );
    }
}
