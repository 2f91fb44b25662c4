//! Country code helpers: flag glyphs and localized country names.

use skywatch_core::Language;

const FALLBACK_FLAG: &str = "🏳️";

/// Offset from an ASCII uppercase letter to its regional indicator symbol
const REGIONAL_INDICATOR_OFFSET: u32 = 0x1F1A5;

// (code, English, Korean)
const COUNTRY_NAMES: &[(&str, &str, &str)] = &[
    ("KR", "South Korea", "대한민국"),
    ("JP", "Japan", "일본"),
    ("US", "United States", "미국"),
    ("GB", "United Kingdom", "영국"),
    ("FR", "France", "프랑스"),
    ("DE", "Germany", "독일"),
    ("CN", "China", "중국"),
    ("TW", "Taiwan", "대만"),
    ("HK", "Hong Kong", "홍콩"),
    ("SG", "Singapore", "싱가포르"),
    ("TH", "Thailand", "태국"),
    ("VN", "Vietnam", "베트남"),
    ("PH", "Philippines", "필리핀"),
    ("ID", "Indonesia", "인도네시아"),
    ("MY", "Malaysia", "말레이시아"),
    ("IN", "India", "인도"),
    ("AU", "Australia", "호주"),
    ("CA", "Canada", "캐나다"),
    ("IT", "Italy", "이탈리아"),
    ("ES", "Spain", "스페인"),
    ("RU", "Russia", "러시아"),
    ("BR", "Brazil", "브라질"),
    ("MX", "Mexico", "멕시코"),
    ("NZ", "New Zealand", "뉴질랜드"),
    ("SE", "Sweden", "스웨덴"),
    ("NO", "Norway", "노르웨이"),
    ("FI", "Finland", "핀란드"),
    ("DK", "Denmark", "덴마크"),
    ("NL", "Netherlands", "네덜란드"),
    ("CH", "Switzerland", "스위스"),
    ("AT", "Austria", "오스트리아"),
    ("BE", "Belgium", "벨기에"),
    ("PT", "Portugal", "포르투갈"),
    ("PL", "Poland", "폴란드"),
    ("CZ", "Czechia", "체코"),
    ("TR", "Türkiye", "튀르키예"),
    ("EG", "Egypt", "이집트"),
    ("AE", "United Arab Emirates", "아랍에미리트"),
    ("SA", "Saudi Arabia", "사우디아라비아"),
];

/// Flag emoji for an ISO-3166-1 alpha-2 code; a white flag for anything else.
pub fn flag(code: &str) -> String {
    let code = code.trim();
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return FALLBACK_FLAG.to_string();
    }

    code.chars()
        .filter_map(|c| char::from_u32(c.to_ascii_uppercase() as u32 + REGIONAL_INDICATOR_OFFSET))
        .collect()
}

/// Localized country name, or the code itself when unknown.
pub fn country_name(code: &str, lang: Language) -> String {
    COUNTRY_NAMES
        .iter()
        .find(|(c, _, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, en, ko)| match lang {
            Language::English => en.to_string(),
            Language::Korean => ko.to_string(),
        })
        .unwrap_or_else(|| code.to_string())
}

/// "<country>" or "<country> · <state>"
pub fn display_country(code: &str, state: Option<&str>, lang: Language) -> String {
    let name = country_name(code, lang);
    match state.map(str::trim).filter(|s| !s.is_empty()) {
        Some(state) => format!("{} · {}", name, state),
        None => name,
    }
}
