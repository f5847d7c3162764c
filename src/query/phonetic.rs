use serde::{Deserialize, Serialize};

/// Phonetic algorithms supported by [`match_phonetic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhoneticAlgorithm {
    Soundex,
    Metaphone,
    DoubleMetaphone,
}

/// Primary and (optional) alternate Double Metaphone codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoubleMetaphone {
    pub primary: String,
    pub alternate: Option<String>,
}

const DEFAULT_METAPHONE_LEN: usize = 10;

fn soundex_digit(c: char) -> Option<char> {
    match c {
        'b' | 'f' | 'p' | 'v' => Some('1'),
        'c' | 'g' | 'j' | 'k' | 'q' | 's' | 'x' | 'z' => Some('2'),
        'd' | 't' => Some('3'),
        'l' => Some('4'),
        'm' | 'n' => Some('5'),
        'r' => Some('6'),
        _ => None,
    }
}

/// American Soundex: first letter plus up to three digit codes.
///
/// Vowels and Y are skipped but break a run of identical codes; H and W
/// are skipped without breaking one, so `Schmidt` collapses to `S530`.
/// Always 4 chars for input containing an ASCII letter, empty otherwise.
pub fn soundex(word: &str) -> String {
    let letters: Vec<char> = word
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_lowercase())
        .collect();

    let Some(&first) = letters.first() else {
        return String::new();
    };

    let mut code = String::with_capacity(4);
    code.push(first.to_ascii_uppercase());
    let mut prev = soundex_digit(first);

    for &c in &letters[1..] {
        match c {
            'a' | 'e' | 'i' | 'o' | 'u' | 'y' => prev = None,
            'h' | 'w' => {}
            _ => {
                if let Some(d) = soundex_digit(c) {
                    if prev != Some(d) {
                        code.push(d);
                        if code.len() == 4 {
                            break;
                        }
                    }
                    prev = Some(d);
                }
            }
        }
    }

    while code.len() < 4 {
        code.push('0');
    }
    code
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'A' | 'E' | 'I' | 'O' | 'U')
}

/// Metaphone code of `word`, truncated to `max_len` characters.
///
/// Simplified rule table: initial-letter rewrites, vowels retained only
/// at the start, silent-H handling, and the usual C/G/S/T digraph
/// transformations (CH/CIA/TIO/SH -> X, TH -> 0, PH -> F, X -> KS).
pub fn metaphone(word: &str, max_len: usize) -> String {
    let w: Vec<char> = word
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if w.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    let mut start = 0;

    // Initial-letter rewrites.
    if w.len() >= 2 {
        match (w[0], w[1]) {
            ('A', 'E') | ('G', 'N') | ('K', 'N') | ('P', 'N') | ('W', 'R') => start = 1,
            ('W', 'H') => {
                out.push('W');
                start = 2;
            }
            ('X', _) => {
                out.push('S');
                start = 1;
            }
            _ => {}
        }
    } else if w[0] == 'X' {
        return "S".to_string();
    }

    let at = |i: usize| -> Option<char> { w.get(i).copied() };
    let mut skip = 0usize;
    let mut i = start;

    while i < w.len() && out.len() < max_len {
        if skip > 0 {
            skip -= 1;
            i += 1;
            continue;
        }
        let c = w[i];

        // Adjacent duplicate letters encode once, except C (CC is handled
        // by its own rule and stays ambiguous for Double Metaphone).
        if i > start && c != 'C' && w[i - 1] == c {
            i += 1;
            continue;
        }

        match c {
            'A' | 'E' | 'I' | 'O' | 'U' => {
                if i == start {
                    out.push(c);
                }
            }
            'B' => {
                // Silent in terminal MB (thumb, comb).
                if !(i + 1 == w.len() && i > 0 && w[i - 1] == 'M') {
                    out.push('B');
                }
            }
            'C' => {
                if at(i + 1) == Some('I') && at(i + 2) == Some('A') {
                    out.push('X');
                } else if at(i + 1) == Some('H') {
                    out.push('X');
                    skip = 1;
                } else if matches!(at(i + 1), Some('E' | 'I' | 'Y')) {
                    if i > 0 && w[i - 1] == 'S' {
                        // Silent in SCE/SCI/SCY (science).
                    } else {
                        out.push('S');
                    }
                } else {
                    out.push('K');
                }
            }
            'D' => {
                if at(i + 1) == Some('G') && matches!(at(i + 2), Some('E' | 'I' | 'Y')) {
                    out.push('J');
                    skip = 1;
                } else {
                    out.push('T');
                }
            }
            'G' => {
                if at(i + 1) == Some('H') {
                    if at(i + 2).is_some_and(is_vowel) {
                        out.push('K');
                    }
                    skip = 1;
                } else if at(i + 1) == Some('N') && i + 2 >= w.len() {
                    // Terminal GN is silent (sign).
                } else if matches!(at(i + 1), Some('E' | 'I' | 'Y')) {
                    out.push('J');
                } else {
                    out.push('K');
                }
            }
            'H' => {
                // Voiced only before a vowel and not after one.
                if at(i + 1).is_some_and(is_vowel) && !(i > 0 && is_vowel(w[i - 1])) {
                    out.push('H');
                }
            }
            'K' => {
                if !(i > 0 && w[i - 1] == 'C') {
                    out.push('K');
                }
            }
            'P' => {
                if at(i + 1) == Some('H') {
                    out.push('F');
                    skip = 1;
                } else {
                    out.push('P');
                }
            }
            'Q' => out.push('K'),
            'S' => {
                if at(i + 1) == Some('H') {
                    out.push('X');
                    skip = 1;
                } else if at(i + 1) == Some('I') && matches!(at(i + 2), Some('O' | 'A')) {
                    out.push('X');
                } else {
                    out.push('S');
                }
            }
            'T' => {
                if at(i + 1) == Some('H') {
                    out.push('0');
                    skip = 1;
                } else if at(i + 1) == Some('I') && matches!(at(i + 2), Some('O' | 'A')) {
                    out.push('X');
                } else {
                    out.push('T');
                }
            }
            'V' => out.push('F'),
            'W' | 'Y' => {
                if at(i + 1).is_some_and(is_vowel) {
                    out.push(c);
                }
            }
            'X' => out.push_str("KS"),
            'Z' => out.push('S'),
            'F' | 'J' | 'L' | 'M' | 'N' | 'R' => out.push(c),
            _ => {}
        }
        i += 1;
    }

    out.truncate(max_len);
    out
}

/// Double Metaphone, reduced to the ambiguous patterns that matter for
/// operator vocabulary: SCH (X vs SK), a leading soft C (S vs K) and CC.
/// The alternate is `None` for unambiguous words.
pub fn double_metaphone(word: &str) -> DoubleMetaphone {
    let primary = metaphone(word, DEFAULT_METAPHONE_LEN);
    if primary.is_empty() {
        return DoubleMetaphone {
            primary,
            alternate: None,
        };
    }

    let upper: String = word
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let rewritten = if upper.contains("SCH") {
        Some(upper.replacen("SCH", "SK", 1))
    } else if upper.len() >= 2
        && upper.starts_with('C')
        && matches!(upper.as_bytes()[1], b'E' | b'I' | b'Y')
    {
        Some(format!("K{}", &upper[1..]))
    } else if upper.contains("CC") {
        Some(upper.replacen("CC", "X", 1))
    } else {
        None
    };

    let alternate = rewritten
        .map(|r| metaphone(&r, DEFAULT_METAPHONE_LEN))
        .filter(|alt| *alt != primary);

    DoubleMetaphone { primary, alternate }
}

/// Similarity of two words under the given phonetic algorithm.
///
/// Exact code match scores 1.0. For Double Metaphone a match between one
/// word's alternate and the other's primary scores 0.9, and between the
/// two alternates 0.8. No match scores 0.0.
pub fn match_phonetic(a: &str, b: &str, algorithm: PhoneticAlgorithm) -> f64 {
    match algorithm {
        PhoneticAlgorithm::Soundex => {
            let (ca, cb) = (soundex(a), soundex(b));
            if !ca.is_empty() && ca == cb { 1.0 } else { 0.0 }
        }
        PhoneticAlgorithm::Metaphone => {
            let ca = metaphone(a, DEFAULT_METAPHONE_LEN);
            let cb = metaphone(b, DEFAULT_METAPHONE_LEN);
            if !ca.is_empty() && ca == cb { 1.0 } else { 0.0 }
        }
        PhoneticAlgorithm::DoubleMetaphone => {
            let da = double_metaphone(a);
            let db = double_metaphone(b);
            if da.primary.is_empty() || db.primary.is_empty() {
                return 0.0;
            }
            if da.primary == db.primary {
                1.0
            } else if da.alternate.as_deref() == Some(db.primary.as_str())
                || db.alternate.as_deref() == Some(da.primary.as_str())
            {
                0.9
            } else if da.alternate.is_some() && da.alternate == db.alternate {
                0.8
            } else {
                0.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soundex_smith_family() {
        assert_eq!(soundex("Smith"), "S530");
        assert_eq!(soundex("Smythe"), "S530");
        assert_eq!(soundex("Schmidt"), "S530");
    }

    #[test]
    fn test_soundex_classics() {
        assert_eq!(soundex("Robert"), "R163");
        assert_eq!(soundex("Rupert"), "R163");
        assert_eq!(soundex("Tymczak"), "T522");
        assert_eq!(soundex("Pfister"), "P236");
    }

    #[test]
    fn test_soundex_length_and_empty() {
        for word in ["a", "firewall", "xylophone", "Mississippi", "bk", "router"] {
            assert_eq!(soundex(word).len(), 4, "soundex({word})");
        }
        assert_eq!(soundex(""), "");
        assert_eq!(soundex("123"), "");
    }

    #[test]
    fn test_soundex_case_insensitive() {
        assert_eq!(soundex("SERVER"), soundex("server"));
    }

    #[test]
    fn test_metaphone_rules() {
        assert_eq!(metaphone("password", 10), "PSWRT");
        assert_eq!(metaphone("knight", 10), "NT");
        assert_eq!(metaphone("nation", 10), "NXN");
        assert_eq!(metaphone("smith", 10), "SM0");
        assert_eq!(metaphone("thumb", 10), "0M");
        assert_eq!(metaphone("science", 10), "SNS");
        assert_eq!(metaphone("edge", 10), "EJ");
    }

    #[test]
    fn test_metaphone_max_len() {
        assert!(metaphone("administration", 4).len() <= 4);
        assert_eq!(metaphone("", 10), "");
    }

    #[test]
    fn test_double_metaphone_sch() {
        let dm = double_metaphone("school");
        assert_eq!(dm.primary, "SXL");
        assert_eq!(dm.alternate.as_deref(), Some("SKL"));
    }

    #[test]
    fn test_double_metaphone_unambiguous() {
        assert!(double_metaphone("router").alternate.is_none());
        assert!(double_metaphone("firewall").alternate.is_none());
    }

    #[test]
    fn test_double_metaphone_leading_soft_c() {
        let dm = double_metaphone("cisco");
        assert!(dm.alternate.is_some());
        assert!(dm.alternate.unwrap().starts_with('K'));
    }

    #[test]
    fn test_match_phonetic_scores() {
        assert_eq!(
            match_phonetic("Smith", "Smythe", PhoneticAlgorithm::Soundex),
            1.0
        );
        assert_eq!(
            match_phonetic("Smith", "Jones", PhoneticAlgorithm::Soundex),
            0.0
        );
        assert_eq!(
            match_phonetic("server", "server", PhoneticAlgorithm::Metaphone),
            1.0
        );
        assert_eq!(
            match_phonetic("", "server", PhoneticAlgorithm::DoubleMetaphone),
            0.0
        );
    }

    #[test]
    fn test_match_phonetic_stable_across_calls() {
        let first = match_phonetic("schedule", "skedule", PhoneticAlgorithm::DoubleMetaphone);
        let second = match_phonetic("schedule", "skedule", PhoneticAlgorithm::DoubleMetaphone);
        assert_eq!(first, second);
    }
}
