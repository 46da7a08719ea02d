//! Pure text transformations applied to extracted fields

use regex::Regex;
use std::sync::LazyLock;

use crate::types::NA;

/// Calendar year of the first regional ceremony
pub const FIRST_LATIN_CEREMONY_YEAR: u32 = 2000;

static ARTIST_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bartists?\b").expect("valid artist pattern"));

static UNWANTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[?%+\n\r\"\u{2022}]").expect("valid sanitize pattern"));

/// Collapse runs of whitespace into single spaces and trim the ends
pub fn collapse_whitespace(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    let mut prev_was_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !prev_was_space && !cleaned.is_empty() {
                cleaned.push(' ');
                prev_was_space = true;
            }
        } else {
            cleaned.push(c);
            prev_was_space = false;
        }
    }
    cleaned.trim_end().to_string()
}

/// Truncate a value at its first `[`, dropping footnote and citation markers
/// ("Crypto.com Arena[12]" -> "Crypto.com Arena")
pub fn strip_brackets(value: &str) -> String {
    match value.find('[') {
        Some(idx) => value[..idx].trim_end().to_string(),
        None => value.to_string(),
    }
}

/// Parse a viewer figure in millions. `None` when the value is neither empty,
/// "TBA" nor a number.
pub fn try_parse_viewers(raw: &str) -> Option<f64> {
    let value = strip_brackets(raw);
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("TBA") || value.eq_ignore_ascii_case("nan")
    {
        return Some(0.0);
    }
    let parsed: f64 = value.replace(',', ".").parse().ok()?;
    parsed.is_finite().then_some(parsed)
}

/// Artist named ahead of the word "artist"/"artists" in a credit line
/// ("John Doe, artist" -> "John Doe"), or "NA" when there is none
pub fn derive_artist(credits: &str) -> String {
    let Some(m) = ARTIST_WORD.find(credits) else {
        return NA.to_string();
    };
    let name = credits[..m.start()].trim_end_matches(|c: char| c == ',' || c.is_whitespace());
    let name = name.trim_start();
    if name.is_empty() {
        NA.to_string()
    } else {
        name.to_string()
    }
}

/// English ordinal suffix for `n` (1st, 2nd, 3rd, 4th, 11th, 12th, 13th, 21st)
pub fn ordinal_suffix(n: u32) -> &'static str {
    if (11..=13).contains(&(n % 100)) {
        return "th";
    }
    match n % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

/// Title of the `n`th regional ceremony, title-cased ("1St Annual Latin Grammy Awards")
pub fn ordinal_title(n: u32) -> String {
    title_case(&format!(
        "{}{} Annual Latin Grammy Awards",
        n,
        ordinal_suffix(n)
    ))
}

/// Regional ceremony title from its year column. Calendar years count from the
/// first ceremony in 2000; smaller values are already ordinals.
pub fn derive_title(year: &str) -> String {
    let Ok(value) = strip_brackets(year).trim().parse::<u32>() else {
        return NA.to_string();
    };
    let n = if value >= FIRST_LATIN_CEREMONY_YEAR {
        value - FIRST_LATIN_CEREMONY_YEAR + 1
    } else {
        value
    };
    ordinal_title(n)
}

/// Title-case the way the published dataset does: every letter that follows a
/// non-letter is uppercased, every other letter lowercased ("66th" -> "66Th")
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_is_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

/// Remove `//`, `?`, `%`, `+`, line breaks, double quotes and bullets
pub fn sanitize_text(text: &str) -> String {
    strip_double_slashes(UNWANTED.replace_all(text, "").into_owned())
}

/// `sanitize_text` plus comma removal, for the artist column
pub fn sanitize_artist(text: &str) -> String {
    sanitize_text(&text.replace(',', ""))
}

/// Removing a pair can join two lone slashes into a new one ("a///b")
fn strip_double_slashes(mut text: String) -> String {
    while text.contains("//") {
        text = text.replace("//", "");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_viewers() {
        assert_eq!(try_parse_viewers("16.9[45]"), Some(16.9));
        assert_eq!(try_parse_viewers("TBA"), Some(0.0));
        assert_eq!(try_parse_viewers(""), Some(0.0));
        assert_eq!(try_parse_viewers("  "), Some(0.0));
        assert_eq!(try_parse_viewers("3,2"), Some(3.2));
        assert_eq!(try_parse_viewers("nan"), Some(0.0));
        assert_eq!(try_parse_viewers("unknown"), None);
    }

    #[test]
    fn test_parse_viewers_idempotent() {
        let once = try_parse_viewers("0.0").unwrap();
        assert_eq!(once, 0.0);
        assert_eq!(try_parse_viewers(&once.to_string()), Some(once));
        let once = try_parse_viewers("9,4[3]").unwrap();
        assert_eq!(try_parse_viewers(&once.to_string()), Some(once));
    }

    #[test]
    fn test_strip_brackets() {
        assert_eq!(strip_brackets("Crypto.com Arena[12]"), "Crypto.com Arena");
        assert_eq!(strip_brackets("Trevor Noah [a][b]"), "Trevor Noah");
        assert_eq!(strip_brackets("Las Vegas"), "Las Vegas");
        assert_eq!(strip_brackets("[1]"), "");
    }

    #[test]
    fn test_derive_artist() {
        assert_eq!(derive_artist("John Doe, artist"), "John Doe");
        assert_eq!(
            derive_artist("Bad Bunny, artists; Tainy, producer"),
            "Bad Bunny"
        );
        assert_eq!(derive_artist("Rosalía, Artist"), NA);
        assert_eq!(derive_artist("Tainy, producer"), NA);
        assert_eq!(derive_artist("artistry award, producer"), NA);
        assert_eq!(derive_artist("artist"), NA);
    }

    #[test]
    fn test_ordinal_title() {
        assert_eq!(ordinal_title(1), "1St Annual Latin Grammy Awards");
        assert_eq!(ordinal_title(2), "2Nd Annual Latin Grammy Awards");
        assert_eq!(ordinal_title(3), "3Rd Annual Latin Grammy Awards");
        assert_eq!(ordinal_title(4), "4Th Annual Latin Grammy Awards");
        assert_eq!(ordinal_title(11), "11Th Annual Latin Grammy Awards");
        assert_eq!(ordinal_title(12), "12Th Annual Latin Grammy Awards");
        assert_eq!(ordinal_title(13), "13Th Annual Latin Grammy Awards");
        assert_eq!(ordinal_title(21), "21St Annual Latin Grammy Awards");
        assert_eq!(ordinal_title(22), "22Nd Annual Latin Grammy Awards");
        assert_eq!(ordinal_title(23), "23Rd Annual Latin Grammy Awards");
        assert_eq!(ordinal_title(111), "111Th Annual Latin Grammy Awards");
    }

    #[test]
    fn test_derive_title_from_year() {
        assert_eq!(derive_title("2000"), "1St Annual Latin Grammy Awards");
        assert_eq!(derive_title("2023"), "24Th Annual Latin Grammy Awards");
        assert_eq!(derive_title("2020[a]"), "21St Annual Latin Grammy Awards");
        assert_eq!(derive_title("22"), "22Nd Annual Latin Grammy Awards");
        assert_eq!(derive_title("NA"), NA);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("66th Annual GRAMMY Awards"), "66Th Annual Grammy Awards");
        assert_eq!(title_case("66th Annual Grammy Awards"), "66Th Annual Grammy Awards");
        assert_eq!(title_case("grammy's best"), "Grammy'S Best");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_sanitize_text() {
        let dirty = "\"Flowers\"?\n100% +Live\r // bonus \u{2022} AC/DC";
        let clean = sanitize_text(dirty);
        assert_eq!(clean, "Flowers100 Live  bonus  AC/DC");
        for bad in ["//", "?", "%", "+", "\n", "\r", "\"", "\u{2022}"] {
            assert!(!clean.contains(bad), "{:?} survived", bad);
        }

        assert_eq!(sanitize_text("AC/?/DC"), "ACDC");
        assert_eq!(sanitize_text("a/\n/b"), "ab");
        assert_eq!(sanitize_text("a///b"), "a/b");
        assert_eq!(sanitize_text("a////b"), "ab");
        for tricky in ["AC/?/DC", "a/\n/b", "x/%/+/y", "a///b"] {
            assert!(!sanitize_text(tricky).contains("//"), "{:?}", tricky);
        }
    }

    #[test]
    fn test_sanitize_artist_drops_commas() {
        assert_eq!(sanitize_artist("Jon Batiste, \"Live\""), "Jon Batiste Live");
        assert_eq!(sanitize_text("Jon Batiste, Live"), "Jon Batiste, Live");
        assert_eq!(sanitize_artist("AC/,/DC"), "ACDC");
        assert!(!sanitize_artist("AC/,/DC").contains("//"));
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b  "), "a b");
        assert_eq!(collapse_whitespace(""), "");
    }
}
