//! The operand vocabulary of the manual's instruction tables.
//!
//! Operands in the manual are drawn from a small closed set of spellings:
//! registers and register pairs, the stack and program counters, `n`/`nn`
//! immediate placeholders, `b` (bit index), `cc` (condition code) and the
//! condition names themselves. Anything wrapped in parentheses is an
//! indirect (memory) operand whatever its content. OCR left a few stray
//! characters in the source text; [normalize_operand] and [normalize_opcode]
//! map them back.
use std::fmt::{self, Display};

/// Every operand spelling the manual uses, longest first and then in
/// manual order. Prefix matching walks this list in order, so when a
/// run-together chunk like `HLn` can be split more than one way the split
/// that takes the longer leading token is found first.
pub const VOCABULARY: [&str; 27] = [
    "r1", "r2", "AF", "BC", "DE", "HL", "SP", "PC", "NZ", "NC", "cc", "Cc", "nn", //
    "A", "B", "C", "D", "E", "F", "H", "L", "Z", "n", "b", "r", "*", "#",
];
/// generic bit-index placeholder (BIT b,r and friends)
pub const BIT_INDEX: &str = "b";
/// marks an instruction that takes no operands in the tables
pub const NO_OPERAND: &str = "-/-";

/// A recognized operand token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// an entry from [VOCABULARY]
    Word(&'static str),
    /// a parenthesized indirect form; `text` runs through the closing
    /// parenthesis and `inner` is what's between them
    Indirect { text: &'a str, inner: &'a str },
}
impl<'a> Token<'a> {
    /// The source text this token was recognized from.
    pub fn text(&self) -> &'a str {
        match self {
            Token::Word(w) => w,
            Token::Indirect { text, .. } => text,
        }
    }
    pub fn len(&self) -> usize { self.text().len() }
}
impl Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.text()) }
}

/// Exact vocabulary lookup.
pub fn word(s: &str) -> Option<&'static str> { VOCABULARY.iter().copied().find(|w| *w == s) }

/// If `s` begins with an opening parenthesis, return the indirect token that
/// runs up to the first closing parenthesis. Parentheses don't nest.
pub fn indirect(s: &str) -> Option<Token<'_>> {
    if !s.starts_with('(') {
        return None;
    }
    let close = s.find(')')?;
    Some(Token::Indirect {
        text: &s[..=close],
        inner: &s[1..close],
    })
}

/// Recognize the whole of `s` as a single operand token.
pub fn recognize(s: &str) -> Option<Token<'_>> {
    if let Some(w) = word(s) {
        return Some(Token::Word(w));
    }
    indirect(s).filter(|t| t.len() == s.len())
}

/// All tokens that `s` begins with: the indirect form first (if any), then
/// vocabulary entries in [VOCABULARY] order.
pub fn prefixes(s: &str) -> Vec<Token<'_>> {
    let mut found = Vec::new();
    if let Some(t) = indirect(s) {
        found.push(t);
    }
    found.extend(VOCABULARY.iter().filter(|w| s.starts_with(**w)).map(|w| Token::Word(*w)));
    found
}

/// Clean up operand text: trim it, undo the letter/digit confusions in the
/// source, and fold the condition-code abbreviations (`Cc`, `c`) to `C`.
pub fn normalize_operand(s: &str) -> String {
    s.trim()
        .replace('O', "0")
        .replace(&['#', '*'][..], "n")
        .replace("Cc", "C")
        .replace('c', "C")
}

/// Clean up opcode text. Hex digits suffered a different set of confusions
/// than operand text did.
pub fn normalize_opcode(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'T' => '7',
            'O' => '0',
            'Q' => '2',
            'S' => '5',
            'l' | 'I' => '1',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vocabulary_is_longest_first() {
        let lens: Vec<usize> = VOCABULARY.iter().map(|w| w.len()).collect();
        assert!(lens.windows(2).all(|w| w[0] >= w[1]));
    }
    #[test]
    fn recognizes_words_and_indirects() {
        assert_eq!(recognize("HL"), Some(Token::Word("HL")));
        assert_eq!(recognize("nn"), Some(Token::Word("nn")));
        assert_eq!(recognize("HLn"), None);
        assert_eq!(
            recognize("(HL)"),
            Some(Token::Indirect {
                text: "(HL)",
                inner: "HL"
            })
        );
        // a trailing remainder means the string isn't a single token
        assert_eq!(recognize("(HL)n"), None);
        // unclosed parentheses aren't recognized
        assert_eq!(recognize("(HL"), None);
        assert_eq!(recognize("X"), None);
    }
    #[test]
    fn first_closing_parenthesis_wins() {
        let t = indirect("($FF00+C))").unwrap();
        assert_eq!(t.text(), "($FF00+C)");
        assert!(matches!(t, Token::Indirect { inner: "$FF00+C", .. }));
        assert!(indirect("HL)").is_none());
    }
    #[test]
    fn prefixes_in_tie_break_order() {
        let p: Vec<&str> = prefixes("HLn").iter().map(|t| t.text()).collect();
        assert_eq!(p, vec!["HL", "H"]);
        let p: Vec<&str> = prefixes("nn").iter().map(|t| t.text()).collect();
        assert_eq!(p, vec!["nn", "n"]);
        let p: Vec<&str> = prefixes("(C)A").iter().map(|t| t.text()).collect();
        assert_eq!(p, vec!["(C)"]);
    }
    #[test]
    fn operand_normalization() {
        assert_eq!(normalize_operand(" cc "), "CC");
        assert_eq!(normalize_operand("Cc"), "C");
        assert_eq!(normalize_operand("#"), "n");
        assert_eq!(normalize_operand("*"), "n");
        assert_eq!(normalize_operand("38H"), "38H");
        assert_eq!(normalize_operand("3OH"), "30H");
        assert_eq!(normalize_operand("(HL)"), "(HL)");
    }
    #[test]
    fn opcode_normalization() {
        assert_eq!(normalize_opcode("TF"), "7F");
        assert_eq!(normalize_opcode("OE"), "0E");
        assert_eq!(normalize_opcode("Q2"), "22");
        assert_eq!(normalize_opcode("SI"), "51");
        assert_eq!(normalize_opcode("lA"), "1A");
        assert_eq!(normalize_opcode("CB"), "CB");
    }
}
