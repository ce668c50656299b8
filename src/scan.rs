//! Walking the manual from top to bottom and pulling out its opcode tables.
//!
//! The instruction chapter of the manual is organized like this:
//! ```text
//! 3.3.1. 8-Bit Loads
//! 1. LD nn,n
//! Description:
//!  Put value nn into n.
//! ...
//! Opcodes:
//! Instruction Parameters Opcode Cycles
//! LD B,n 06 8
//! LD C,n 0E 8
//! 2. LD r1,r2
//! ...
//! ```
//! Major sections are numbered `3.3.<n>.` and subsections `<n>.`, both
//! counting up from 1. Each subsection header names an instruction
//! signature, which tells us how many operands its mnemonic takes in the
//! `Opcodes:` table that follows. Everything else (descriptions, flag
//! tables, page headers) is prose and is skipped.
//!
//! The scanner's output is the intermediate table: the section and
//! subsection labels in document order, each followed by the instruction
//! records read beneath it.
use super::segment::{self, DELIMITERS};
use super::table::{IntermediateTable, TableLine};
use super::token;
use super::*;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;

/// every major section of the instruction chapter starts with this
pub const SECTION_PREFIX: &str = "3.3.";
/// introduces the table of opcodes for the current subsection
pub const OPCODES_MARKER: &str = "Opcodes:";

/// Where the scanner is in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// before the first major section; only a section header is recognized
    ScanningSection,
    /// inside a section or subsection, looking for the next `Opcodes:` marker
    AwaitingOpcodesMarker,
    /// inside an `Opcodes:` table; lines starting with a known mnemonic are records
    ReadingOpcodeLines,
}

/// The operand count in effect for a mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contract {
    pub arity: usize,
    /// the current subsection raised the count above the established one
    pub widened: bool,
}

/// A snapshot of every operand-count contract in effect at one point in
/// the document.
///
/// Contracts come in two layers. The subsection layer holds what the current
/// subsection header declared. The established layer holds, per mnemonic,
/// the count from the first subsection whose table actually used it. An
/// established count never changes afterwards: a subsection that declares a
/// larger count widens the mnemonic for that subsection only (the
/// conditional forms `JP cc,nn`, `CALL cc,nn`, ... are introduced this
/// way), and one that declares a smaller count leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contracts {
    established: BTreeMap<String, usize>,
    subsection: BTreeMap<String, Contract>,
}
impl Contracts {
    /// The snapshot in effect after a subsection header declaring `declared`.
    pub fn enter_subsection(self, declared: &[(String, usize)]) -> Self {
        let subsection = declared
            .iter()
            .map(|(mnemonic, arity)| {
                let widened = self.established.get(mnemonic).map_or(false, |&est| *arity > est);
                (mnemonic.clone(), Contract { arity: *arity, widened })
            })
            .collect();
        Contracts {
            established: self.established,
            subsection,
        }
    }
    /// The snapshot in effect after a major section header.
    pub fn leave_subsection(self) -> Self {
        Contracts {
            established: self.established,
            subsection: BTreeMap::new(),
        }
    }
    /// The contract a line starting with `mnemonic` should be read under, if any.
    pub fn resolve(&self, mnemonic: &str) -> Option<Contract> {
        self.subsection.get(mnemonic).copied().or_else(|| {
            self.established
                .get(mnemonic)
                .map(|&arity| Contract { arity, widened: false })
        })
    }
    /// Record that a line for `mnemonic` was read under `contract`. The first
    /// unwidened use establishes the mnemonic's count.
    pub fn seal(mut self, mnemonic: &str, contract: Contract) -> Self {
        if !contract.widened {
            self.established.entry(mnemonic.to_string()).or_insert(contract.arity);
        }
        self
    }
    pub fn established(&self, mnemonic: &str) -> Option<usize> { self.established.get(mnemonic).copied() }
}

fn uppercase_only(s: &str) -> String { s.chars().filter(char::is_ascii_uppercase).collect() }

/// Split a header signature at its first operand delimiter.
fn split_signature(sig: &str) -> (&str, &str) {
    match sig.find(&DELIMITERS[..]) {
        Some(idx) => (&sig[..idx], &sig[idx + 1..]),
        None => (sig.trim_end(), ""),
    }
}

/// Strip the operand token that ends `s` and return what precedes it. If `s`
/// doesn't end in an operand token, return all of it.
fn before_trailing_operand(s: &str) -> &str {
    let s = s.trim_end();
    for width in [2, 1] {
        if let Some(start) = s.len().checked_sub(width).filter(|&i| s.is_char_boundary(i)) {
            if token::word(&s[start..]).is_some() {
                return &s[..start];
            }
        }
    }
    if s.ends_with(')') {
        return s.find('(').map_or(s.trim(), |idx| &s[..idx]);
    }
    s.trim()
}

/// Count the operands a header signature gives `mnemonic`. The first operand
/// is a (two- or one-character) vocabulary token or a parenthesized form;
/// whatever follows it, commas removed, is the second if all of it is a token.
fn signature_arity(sig: &str, mnemonic: &str) -> usize {
    let removed = sig.replacen(mnemonic, "", 1);
    let removed = removed.trim_start();
    let first = [2, 1]
        .into_iter()
        .filter_map(|width| removed.get(..width))
        .find_map(token::word)
        .map(str::len)
        .or_else(|| token::indirect(removed).map(|t| t.len()));
    match first {
        None => 0,
        Some(len) => {
            let second = removed[len..].replace(',', "");
            let second = second.trim();
            if token::recognize(second).is_some() {
                2
            } else {
                1
            }
        }
    }
}

/// Derive the (mnemonic, operand count) declarations a subsection header
/// makes. `signature` is the header with its `<n>.` label removed.
///
/// Two names are tried: the capitals in front of the signature's trailing
/// operand token, and the capitals of its first word. They usually agree;
/// where they don't (`RLCA` declares both `RLC` and `RLCA`) both are kept.
pub fn header_contracts(signature: &str) -> Vec<(String, usize)> {
    let signature = signature.trim_start();
    let (first_part, _) = split_signature(signature);
    let names = [
        uppercase_only(before_trailing_operand(first_part)),
        uppercase_only(signature.split_whitespace().next().unwrap_or("")),
    ];
    names
        .into_iter()
        .filter(|name| !name.is_empty())
        .map(|name| {
            let arity = signature_arity(signature, &name);
            (name, arity)
        })
        .collect()
}

/// The container for the document walk.
pub struct Scanner {
    state: ScanState,
    /// number of the next expected major section
    section: usize,
    /// number of the next expected subsection
    subsection: usize,
    /// labels of the major sections seen so far
    seen_sections: Vec<String>,
    contracts: Contracts,
    table: IntermediateTable,
}
impl Scanner {
    pub fn new() -> Self {
        Scanner {
            state: ScanState::ScanningSection,
            section: 1,
            subsection: 1,
            seen_sections: Vec::new(),
            contracts: Contracts::default(),
            table: IntermediateTable::new(),
        }
    }
    #[cfg(test)]
    pub fn state(&self) -> ScanState { self.state }
    #[cfg(test)]
    pub fn contracts(&self) -> &Contracts { &self.contracts }

    /// Advance the scanner by one physical line of the manual.
    pub fn scan_line(&mut self, line: &str, line_num: usize) -> Result<(), Error> {
        let section_label = format!("{}{}.", SECTION_PREFIX, self.section);
        let subsection_label = format!("{}.", self.subsection);
        if line.starts_with(&section_label) {
            verbose_println!("line {}: section {}", line_num, line.trim());
            self.table.push(TableLine::Section(section_label.clone()));
            self.seen_sections.push(section_label);
            self.section += 1;
            self.subsection = 1;
            self.contracts = std::mem::take(&mut self.contracts).leave_subsection();
            self.state = ScanState::AwaitingOpcodesMarker;
            return Ok(());
        }
        if self.state == ScanState::ScanningSection {
            // preamble (title page, table of contents, ...)
            return Ok(());
        }
        if line.starts_with(&subsection_label) && !self.seen_sections.iter().any(|s| line.contains(s.as_str())) {
            // a subsection header; the guard above skips repeated page headers
            // like "3.3.1. 8-Bit Loads" that happen to start with the next label
            let declared = header_contracts(&line[subsection_label.len()..]);
            verbose_println!(
                "line {}: subsection {} declares {:?}",
                line_num,
                line.trim(),
                declared
            );
            self.table.push(TableLine::Subsection(subsection_label));
            self.contracts = std::mem::take(&mut self.contracts).enter_subsection(&declared);
            for (mnemonic, arity) in &declared {
                if let Some(est) = self.contracts.established(mnemonic).filter(|&est| *arity > est) {
                    verbose_println!("line {}: {} widened from {} to {} operands", line_num, mnemonic, est, arity);
                }
            }
            self.subsection += 1;
            self.state = ScanState::AwaitingOpcodesMarker;
            return Ok(());
        }
        if line.contains(OPCODES_MARKER) {
            self.state = ScanState::ReadingOpcodeLines;
            return Ok(());
        }
        if self.state != ScanState::ReadingOpcodeLines {
            return Ok(());
        }
        let mnemonic = line.split_whitespace().next().unwrap_or("");
        if let Some(contract) = self.contracts.resolve(mnemonic) {
            let record = segment::segment_line(line, contract.arity, contract.widened, line_num)?;
            self.contracts = std::mem::take(&mut self.contracts).seal(mnemonic, contract);
            self.table.push(TableLine::Record(record));
        }
        // anything else is prose between the tables
        Ok(())
    }

    /// Scan every line and return the resulting intermediate table.
    pub fn scan_lines<I, T>(mut self, iter: I) -> Result<IntermediateTable, Error>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        for (idx, line) in iter.into_iter().enumerate() {
            self.scan_line(line.as_ref(), idx + 1)?;
        }
        Ok(self.table)
    }
}

/// Scan the manual at `path` into an intermediate table.
pub fn scan_file(path: &Path) -> Result<IntermediateTable, Error> {
    let src = io::BufReader::new(File::open(path)?)
        .lines()
        .collect::<Result<Vec<String>, io::Error>>()?;
    Scanner::new().scan_lines(src)
}
