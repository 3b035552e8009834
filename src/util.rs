use once_cell::sync::Lazy;
use regex::Regex;

/// 数値＋サフィックス（K/M/B）パターン（例: "1.2K", "3M", "1,234"）
static COUNT_WITH_SUFFIX_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d[\d.,]*)\s*([KMBkmb])?").expect("Failed to compile count regex")
});

/// アバターURL内のサイズ指定（例: "=s88-c-k"）
static LOGO_SIZE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bs(\d+)\b").expect("Failed to compile logo size regex"));

/// サイズ指定が見つからない場合のロゴサイズ
pub const DEFAULT_LOGO_SIZE: u32 = 100;

/// 数字以外の文字を取り除く
///
/// # Examples
/// ```
/// use innertube_harvest::util::strip_non_digit;
/// assert_eq!(strip_non_digit("Like this comment along with 1,234 other people"), "1234");
/// ```
pub fn strip_non_digit(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// 数字だけを抜き出して整数に変換（数字が無ければNone）
pub fn parse_digits(text: &str) -> Option<u64> {
    let digits = strip_non_digit(text);
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// サフィックス付きの件数表記を整数に変換
///
/// "1.2K" → 1200、"3M" → 3000000、"1,234" → 1234
///
/// # Examples
/// ```
/// use innertube_harvest::util::parse_count_with_suffix;
/// assert_eq!(parse_count_with_suffix("1.2K"), Some(1200));
/// assert_eq!(parse_count_with_suffix("15.3M subscribers"), Some(15_300_000));
/// assert_eq!(parse_count_with_suffix(""), None);
/// ```
pub fn parse_count_with_suffix(text: &str) -> Option<u64> {
    let caps = COUNT_WITH_SUFFIX_REGEX.captures(text.trim())?;
    let number: f64 = caps[1].replace(',', "").parse().ok()?;

    let multiplier = match caps.get(2).map(|m| m.as_str().to_ascii_uppercase()) {
        Some(s) if s == "K" => 1_000.0,
        Some(s) if s == "M" => 1_000_000.0,
        Some(s) if s == "B" => 1_000_000_000.0,
        _ => 1.0,
    };

    Some((number * multiplier).round() as u64)
}

/// アバターURLからロゴサイズを推定
///
/// URL末尾の `sNN` 指定のうち最後のものを使う。無ければ100。
pub fn logo_size_from_url(url: &str) -> u32 {
    LOGO_SIZE_REGEX
        .captures_iter(url)
        .last()
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(DEFAULT_LOGO_SIZE)
}
