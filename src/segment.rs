//! Splitting one line of an opcode table into its fields.
//!
//! A table line looks like
//! ```text
//! LD A,(HL)   7E   8
//! ```
//! i.e. mnemonic, operands, one or two opcode bytes and a cycle count, with
//! nothing but whitespace to tell the columns apart. The operand column is
//! the hard part: commas are sometimes missing (`LD An`), sometimes rendered
//! as `y`, and the number of operands can only be known from the surrounding
//! subsection, so the caller supplies it.
use super::token;
use super::*;

/// Characters that separate operands. OCR turned some commas into `y`.
pub const DELIMITERS: [char; 2] = [',', 'y'];

/// The fields recovered from one manual line. Operand and opcode text has
/// been normalized but nothing else is interpreted yet; in particular the
/// cycle text may turn out to be prose that slipped into the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionRecord {
    pub mnemonic: String,
    /// read under a subsection that widened the mnemonic's operand count
    pub widened: bool,
    pub operands: Vec<String>,
    /// opcode bytes as hex text; two entries for prefixed opcodes
    pub opcode: Vec<String>,
    pub cycles: String,
}

/// Split off the first whitespace-delimited token (leading whitespace is skipped).
fn front(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    s.split_at(end)
}
/// Split off the last whitespace-delimited token, returning (token, everything before it).
fn back(s: &str) -> (&str, &str) {
    let s = s.trim_end();
    let start = s
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map_or(0, |(i, c)| i + c.len_utf8());
    (&s[start..], &s[..start])
}
/// Split `s` at its first operand delimiter, dropping the delimiter.
///
/// The operand before the delimiter must be a single word. When whitespace
/// separates it from the delimiter (`A ,B`, `A y B`) it must also be a
/// known operand, so a `y` inside prose further along the line never splits.
fn split_at_delimiter(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    let idx = s.find(&DELIMITERS[..])?;
    let first = s[..idx].trim_end();
    if first.contains(char::is_whitespace) {
        return None;
    }
    if first.len() < idx && !is_operand(first) {
        return None;
    }
    Some((first, &s[idx + 1..]))
}
fn is_operand(s: &str) -> bool {
    token::recognize(s).is_some() || token::recognize(&token::normalize_operand(s)).is_some()
}

/// Every way of reading `chunk` as exactly `n` run-together operand tokens.
///
/// Parses come back in the order [token::prefixes] offers tokens, so the
/// first parse is the one whose leading tokens are longest.
pub fn candidate_parses(chunk: &str, n: usize) -> Vec<Vec<&str>> {
    if n == 0 {
        return if chunk.is_empty() { vec![Vec::new()] } else { Vec::new() };
    }
    token::prefixes(chunk)
        .into_iter()
        .flat_map(|t| {
            candidate_parses(&chunk[t.len()..], n - 1).into_iter().map(move |mut rest| {
                rest.insert(0, t.text());
                rest
            })
        })
        .collect()
}

/// Pull `n` operands off the front of `text`, returning them along with
/// whatever follows the operand column.
fn extract_operands(text: &str, n: usize, line_num: usize) -> Result<(Vec<&str>, &str), Error> {
    if let Some((first, rest)) = split_at_delimiter(text) {
        if n == 1 {
            return Ok((vec![first], rest));
        }
        let (mut tail, remain) = extract_operands(rest, n - 1, line_num)?;
        tail.insert(0, first);
        return Ok((tail, remain));
    }
    let (chunk, remain) = front(text);
    if n == 1 {
        return Ok((vec![chunk], remain));
    }
    // no delimiter; the operands have been run together
    let (chosen, alternatives) = choose_parse(chunk, n, line_num)?;
    if alternatives > 1 {
        warn!(
            "line {}: \"{}\" reads as {} different operand lists; using {}",
            line_num,
            chunk,
            alternatives,
            chosen.join(",")
        );
    }
    Ok((chosen, remain))
}

/// Pick the first of the candidate parses of `chunk`, along with how many
/// there were to pick from.
fn choose_parse(chunk: &str, n: usize, line_num: usize) -> Result<(Vec<&str>, usize), Error> {
    let mut parses = candidate_parses(chunk, n);
    let count = parses.len();
    if count == 0 {
        return Err(recognition_err!(
            Some(line_num),
            "can't read \"{}\" as {} operands",
            chunk,
            n
        ));
    }
    Ok((parses.swap_remove(0), count))
}

/// Split one table line into an [InstructionRecord], given the number of
/// operands in effect for its mnemonic.
///
/// Whatever is left once the mnemonic and operands are gone ends in the cycle
/// count; the tokens in between are the opcode bytes.
pub fn segment_line(line: &str, arity: usize, widened: bool, line_num: usize) -> Result<InstructionRecord, Error> {
    let (mnemonic, rest) = front(line);
    let (operands, rest) = if arity == 0 {
        // only consume the next token if it's the explicit "no operands" marker
        let (next, after) = front(rest);
        (Vec::new(), if next == token::NO_OPERAND { after } else { rest })
    } else {
        extract_operands(rest, arity, line_num)?
    };
    let (cycles, opcode) = back(rest);
    Ok(InstructionRecord {
        mnemonic: mnemonic.to_string(),
        widened,
        operands: operands.into_iter().map(token::normalize_operand).collect(),
        opcode: opcode.split_whitespace().map(token::normalize_opcode).collect(),
        cycles: cycles.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(line: &str, arity: usize) -> InstructionRecord { segment_line(line, arity, false, 1).unwrap() }

    #[test]
    fn register_to_register() {
        let r = seg("LD A,B 7F 4", 2);
        assert_eq!(r.mnemonic, "LD");
        assert_eq!(r.operands, vec!["A", "B"]);
        assert_eq!(r.opcode, vec!["7F"]);
        assert_eq!(r.cycles, "4");
        assert!(!r.widened);
    }
    #[test]
    fn indirect_destination() {
        let r = seg("  LD (HL),n    36   8", 2);
        assert_eq!(r.operands, vec!["(HL)", "n"]);
        assert_eq!(r.opcode, vec!["36"]);
        assert_eq!(r.cycles, "8");
    }
    #[test]
    fn no_operands() {
        let r = seg("NOP -/- 00 4", 0);
        assert!(r.operands.is_empty());
        assert_eq!(r.opcode, vec!["00"]);
        assert_eq!(r.cycles, "4");
        // without the marker nothing is consumed as operand text
        let r = seg("DAA 27 4", 0);
        assert!(r.operands.is_empty());
        assert_eq!(r.opcode, vec!["27"]);
    }
    #[test]
    fn single_operand() {
        let r = seg("PUSH AF F5 16", 1);
        assert_eq!(r.operands, vec!["AF"]);
        assert_eq!(r.opcode, vec!["F5"]);
        let r = seg("JP (HL) E9 4", 1);
        assert_eq!(r.operands, vec!["(HL)"]);
    }
    #[test]
    fn prefixed_opcode() {
        let r = seg("BIT b,A CB 47 8", 2);
        assert_eq!(r.operands, vec!["b", "A"]);
        assert_eq!(r.opcode, vec!["CB", "47"]);
        assert_eq!(r.cycles, "8");
    }
    #[test]
    fn y_delimiter_and_spaced_comma() {
        assert_eq!(seg("LD Ay(C) F2 8", 2).operands, vec!["A", "(C)"]);
        assert_eq!(seg("ADD A, B 80 4", 2).operands, vec!["A", "B"]);
    }
    #[test]
    fn spaced_delimiters() {
        assert_eq!(seg("LD A ,B 78 4", 2).operands, vec!["A", "B"]);
        assert_eq!(seg("LD A y B 78 4", 2).operands, vec!["A", "B"]);
        assert_eq!(seg("JP cc ,nn C2 12", 2).operands, vec!["CC", "nn"]);
        // a y in the prose after a single operand is not a delimiter
        let r = seg("LD A,B by 78 4", 2);
        assert_eq!(r.operands, vec!["A", "B"]);
        assert_eq!(r.cycles, "4");
    }
    #[test]
    fn run_together_operands() {
        let r = seg("LD An 3E 8", 2);
        assert_eq!(r.operands, vec!["A", "n"]);
        assert_eq!(r.opcode, vec!["3E"]);
        let r = seg("LD (HL)n 36 12", 2);
        assert_eq!(r.operands, vec!["(HL)", "n"]);
    }
    #[test]
    fn ambiguous_operands_take_longest_first() {
        assert_eq!(candidate_parses("nnn", 2), vec![vec!["nn", "n"], vec!["n", "nn"]]);
        let r = seg("LD nnn 99 4", 2);
        assert_eq!(r.operands, vec!["nn", "n"]);
    }
    #[test]
    fn ambiguity_is_counted() -> Result<(), Error> {
        // more than one reading warns and keeps the first
        assert_eq!(choose_parse("nnn", 2, 9)?, (vec!["nn", "n"], 2));
        assert_eq!(choose_parse("An", 2, 9)?, (vec!["A", "n"], 1));
        let e = choose_parse("QX", 2, 9).unwrap_err();
        assert_eq!(e.kind, ErrorKind::Recognition);
        assert_eq!(e.line, Some(9));
        Ok(())
    }
    #[test]
    fn candidate_parses_are_deterministic() {
        assert_eq!(candidate_parses("HLSP", 2), candidate_parses("HLSP", 2));
        assert_eq!(candidate_parses("HLSP", 2), vec![vec!["HL", "SP"]]);
        assert!(candidate_parses("HLSP", 1).is_empty());
    }
    #[test]
    fn unrecognizable_operands_are_fatal() {
        let e = segment_line("LD QX 99 4", 2, false, 17).unwrap_err();
        assert_eq!(e.kind, ErrorKind::Recognition);
        assert_eq!(e.line, Some(17));
    }
    #[test]
    fn confusions_are_normalized() {
        let r = seg("LD A,# 3E 8", 2);
        assert_eq!(r.operands, vec!["A", "n"]);
        let r = seg("LD A,A TF 4", 2);
        assert_eq!(r.opcode, vec!["7F"]);
        let r = seg("JP cc,nn CQ 12", 2);
        assert_eq!(r.operands, vec!["CC", "nn"]);
        assert_eq!(r.opcode, vec!["C2"]);
    }
    #[test]
    fn widened_flag_is_carried() {
        let r = segment_line("JP NZ,nn C2 12", 2, true, 3).unwrap();
        assert!(r.widened);
        assert_eq!(r.operands, vec!["NZ", "nn"]);
    }
    #[test]
    fn prose_cycles_are_kept_verbatim() {
        let r = seg("LD A,B is the same as", 2);
        assert_eq!(r.operands, vec!["A", "B"]);
        assert_eq!(r.cycles, "as");
    }
}
