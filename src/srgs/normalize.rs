//! Word splitting and normalization
//!
//! Grammar literals and match input go through the same functions so the
//! compiled pattern and the input agree on what a word is.

use super::config::Normalization;
use super::grammar::InputMode;
use std::borrow::Cow;

/// Whether `c` is a telephone keypad key
#[inline]
pub fn is_dtmf_key(c: char) -> bool {
    matches!(c, '0'..='9' | '*' | '#' | 'a'..='d' | 'A'..='D')
}

/// Split text into words
///
/// Voice text splits on the separator (any whitespace when the separator is
/// whitespace). DTMF text yields one word per non-space character.
pub fn split_words(text: &str, mode: InputMode, separator: char) -> Vec<&str> {
    match mode {
        InputMode::Voice if separator.is_whitespace() => text.split_whitespace().collect(),
        InputMode::Voice => text
            .split(separator)
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .collect(),
        InputMode::Dtmf => text
            .char_indices()
            .filter(|(_, c)| !c.is_whitespace())
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect(),
    }
}

impl Normalization {
    /// Normalize one word
    pub fn apply<'a>(&self, word: &'a str) -> Cow<'a, str> {
        let folds = self.strip_diacritics && !word.is_ascii();
        let lowers = self.case_insensitive && word.chars().any(char::is_uppercase);
        if !folds && !lowers {
            return Cow::Borrowed(word);
        }

        let mut out = String::with_capacity(word.len());
        for c in word.chars() {
            match fold_diacritic(c).filter(|_| folds) {
                Some(base) => out.push_str(base),
                None => out.push(c),
            }
        }
        if self.case_insensitive {
            out = out.to_lowercase();
        }
        Cow::Owned(out)
    }
}

/// Base letters of accented Latin-1 and Latin Extended-A characters
fn fold_diacritic(c: char) -> Option<&'static str> {
    let upper = match c {
        'À'..='Å' | 'à'..='å' | 'Ā'..='ą' => "A",
        'Æ' | 'æ' => "AE",
        'Ç' | 'ç' | 'Ć'..='č' => "C",
        'Ð' | 'ð' | 'Ď'..='đ' => "D",
        'È'..='Ë' | 'è'..='ë' | 'Ē'..='ě' => "E",
        'Ĝ'..='ģ' => "G",
        'Ĥ'..='ħ' => "H",
        'Ì'..='Ï' | 'ì'..='ï' | 'Ĩ'..='ı' => "I",
        'Ĵ' | 'ĵ' => "J",
        'Ķ' | 'ķ' => "K",
        'Ĺ'..='ł' => "L",
        'Ñ' | 'ñ' | 'Ń'..='ň' => "N",
        'Ò'..='Ö' | 'Ø' | 'ò'..='ö' | 'ø' | 'Ō'..='ő' => "O",
        'Œ' | 'œ' => "OE",
        'Ŕ'..='ř' => "R",
        'Ś'..='š' => "S",
        'ß' => return Some("ss"),
        'Ţ'..='ŧ' => "T",
        'Þ' | 'þ' => "TH",
        'Ù'..='Ü' | 'ù'..='ü' | 'Ũ'..='ų' => "U",
        'Ŵ' | 'ŵ' => "W",
        'Ý' | 'ý' | 'ÿ' | 'Ŷ'..='Ÿ' => "Y",
        'Ź'..='ž' => "Z",
        _ => return None,
    };
    if c.is_lowercase() {
        Some(match upper {
            "A" => "a",
            "AE" => "ae",
            "C" => "c",
            "D" => "d",
            "E" => "e",
            "G" => "g",
            "H" => "h",
            "I" => "i",
            "J" => "j",
            "K" => "k",
            "L" => "l",
            "N" => "n",
            "O" => "o",
            "OE" => "oe",
            "R" => "r",
            "S" => "s",
            "T" => "t",
            "TH" => "th",
            "U" => "u",
            "W" => "w",
            "Y" => "y",
            _ => "z",
        })
    } else {
        Some(upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_voice() {
        assert_eq!(
            split_words("  book\ta  flight ", InputMode::Voice, ' '),
            vec!["book", "a", "flight"]
        );
        assert_eq!(
            split_words("a, b ,,c", InputMode::Voice, ','),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn test_split_dtmf() {
        assert_eq!(
            split_words("12 3#", InputMode::Dtmf, ' '),
            vec!["1", "2", "3", "#"]
        );
    }

    #[test]
    fn test_dtmf_keys() {
        assert!("0123456789*#ABCDabcd".chars().all(is_dtmf_key));
        assert!(!is_dtmf_key('e'));
        assert!(!is_dtmf_key(' '));
    }

    #[test]
    fn test_case_folding() {
        let n = Normalization::default();
        assert_eq!(n.apply("Yes"), "yes");
        assert!(matches!(n.apply("yes"), Cow::Borrowed(_)));
        assert_eq!(Normalization::exact().apply("Yes"), "Yes");
    }

    #[test]
    fn test_diacritics() {
        let n = Normalization {
            case_insensitive: false,
            strip_diacritics: true,
        };
        assert_eq!(n.apply("Café"), "Cafe");
        assert_eq!(n.apply("Ærø"), "AEro");
        assert_eq!(n.apply("Straße"), "Strasse");

        let both = Normalization {
            case_insensitive: true,
            strip_diacritics: true,
        };
        assert_eq!(both.apply("ÉCOLE"), "ecole");
    }
}
