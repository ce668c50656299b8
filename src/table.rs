//! The intermediate table sits between extraction and code generation so a
//! person can inspect (and fix up) what was pulled out of the manual before
//! anything is generated from it.
//!
//! It's plain text, one item per line:
//! ```text
//! 3.3.1.
//! 1.
//! LD|B,n|06|8
//! LD|A,(HL)|7E|8
//! 3.3.3.
//! 2.
//! JP_FLAG|NZ,nn|C2|12
//! BIT|b,A|CB,47|8
//! ```
//! Section and subsection labels are written on their own; records are
//! mnemonic, operands, opcode bytes and cycle count separated by `|`, with
//! list fields separated by commas. A mnemonic read under a widened operand
//! count carries the `_FLAG` suffix.

use super::segment::InstructionRecord;
use super::*;

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt::{self, Display};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

pub const FIELD_SEPARATOR: char = '|';
pub const LIST_SEPARATOR: char = ',';
pub const WIDENED_SUFFIX: &str = "_FLAG";

lazy_static! {
    static ref SECTION_LABEL: Regex = Regex::new(r"^\d+\.\d+\.\d+\.").unwrap();
    static ref SUBSECTION_LABEL: Regex = Regex::new(r"^\d+\.").unwrap();
}

/// One line of the intermediate table as the scanner produces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableLine {
    Section(String),
    Subsection(String),
    Record(InstructionRecord),
}
impl Display for TableLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableLine::Section(label) | TableLine::Subsection(label) => write!(f, "{}", label),
            TableLine::Record(r) => write!(
                f,
                "{}{}{sep}{}{sep}{}{sep}{}",
                r.mnemonic,
                if r.widened { WIDENED_SUFFIX } else { "" },
                r.operands.join(","),
                r.opcode.join(","),
                r.cycles,
                sep = FIELD_SEPARATOR
            ),
        }
    }
}

#[derive(Debug)]
pub struct IntermediateTable {
    lines: Vec<TableLine>,
}
impl IntermediateTable {
    pub fn new() -> Self { IntermediateTable { lines: Vec::new() } }
    pub fn push(&mut self, line: TableLine) { self.lines.push(line) }
    pub fn record_count(&self) -> usize { self.iter().filter(|l| matches!(l, TableLine::Record(_))).count() }
    pub fn write_to_file(&self, f: &mut dyn io::Write) -> Result<(), Error> {
        for line in self.iter() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
    pub fn write_to_path(&self, path: &Path) -> Result<(), Error> {
        let mut file = io::BufWriter::new(File::create(path)?);
        self.write_to_file(&mut file)?;
        io::Write::flush(&mut file)?;
        Ok(())
    }
}

use std::ops::Deref;
impl Deref for IntermediateTable {
    type Target = Vec<TableLine>;
    fn deref(&self) -> &Self::Target { &self.lines }
}

/// The section and subsection labels an entry was read under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provenance {
    pub section: Option<String>,
    pub subsection: Option<String>,
}
impl Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.section.as_deref().unwrap_or("-"),
            self.subsection.as_deref().unwrap_or("-")
        )
    }
}

/// A record read back from the intermediate table, with its opcode resolved
/// to a key and its cycle count checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub provenance: Provenance,
    pub mnemonic: String,
    pub widened: bool,
    pub operands: Vec<String>,
    /// 0x00..=0xff for single-byte opcodes, 0x1xx for prefixed ones
    pub key: u16,
    pub cycles: u32,
    /// line of the table the entry came from
    pub line: usize,
}
impl TableEntry {
    /// The mnemonic as it's written in the table, widened suffix included.
    pub fn tagged_mnemonic(&self) -> String {
        if self.widened {
            format!("{}{}", self.mnemonic, WIDENED_SUFFIX)
        } else {
            self.mnemonic.clone()
        }
    }
}

/// Turn an entry's opcode bytes into its key. A two-byte opcode starting with
/// the prefix byte maps into the prefixed space by putting a 1 in front of
/// its second byte; otherwise the first byte is the key.
pub fn combine_key(bytes: &[&str], prefix: u8) -> Result<u16, Error> {
    let first = bytes.first().ok_or_else(|| general_err!("no opcode bytes"))?;
    let first = u8::from_str_radix(first, 16)?;
    match bytes {
        [_, second] if first == prefix => Ok(u16::from_str_radix(&format!("1{}", second), 16)?),
        _ => Ok(first as u16),
    }
}

/// Parse one record line. `Ok(None)` means the line isn't an instruction
/// (its cycle field isn't a number) and should be skipped.
fn entry_from_str(s: &str, provenance: &Provenance, prefix: u8, line: usize) -> Result<Option<TableEntry>, Error> {
    let fields: Vec<&str> = s.split(FIELD_SEPARATOR).collect();
    let [mnemonic, operands, opcode, cycles] = fields[..] else {
        return Err(table_err!(
            Some(line),
            "expected 4 fields separated by '{}', found {}",
            FIELD_SEPARATOR,
            fields.len()
        ));
    };
    let Ok(cycles) = cycles.trim().parse::<u32>() else {
        verbose_println!("line {}: skipping \"{}\"; cycle count isn't a number", line, s);
        return Ok(None);
    };
    let (mnemonic, widened) = match mnemonic.strip_suffix(WIDENED_SUFFIX) {
        Some(m) => (m, true),
        None => (mnemonic, false),
    };
    let bytes: Vec<&str> = opcode.split(LIST_SEPARATOR).map(str::trim).collect();
    if !(1..=2).contains(&bytes.len()) || bytes.iter().any(|b| b.is_empty()) {
        return Err(table_err!(Some(line), "bad opcode field \"{}\"", opcode));
    }
    let key = combine_key(&bytes, prefix).map_err(|e| e.at_line(line))?;
    Ok(Some(TableEntry {
        provenance: provenance.clone(),
        mnemonic: mnemonic.trim().to_string(),
        widened,
        operands: operands
            .split(LIST_SEPARATOR)
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect(),
        key,
        cycles,
        line,
    }))
}

/// Read table entries from a sequence of lines, tracking the section and
/// subsection labels each one falls under.
pub fn entries_from_str_iter<I, T>(iter: I, prefix: u8) -> Result<Vec<TableEntry>, Error>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let mut provenance = Provenance::default();
    let mut entries = Vec::new();
    for (idx, s) in iter.into_iter().enumerate() {
        let line = idx + 1;
        let s = s.as_ref().trim();
        if s.is_empty() {
            continue;
        }
        if let Some(m) = SECTION_LABEL.find(s) {
            provenance.section = Some(m.as_str().to_string());
            provenance.subsection = None;
        } else if let Some(m) = SUBSECTION_LABEL.find(s) {
            provenance.subsection = Some(m.as_str().to_string());
        } else if let Some(entry) = entry_from_str(s, &provenance, prefix, line)? {
            entries.push(entry);
        }
    }
    Ok(entries)
}

pub fn read_from_file(path: &Path, prefix: u8) -> Result<Vec<TableEntry>, Error> {
    let file = BufReader::new(File::open(path)?)
        .lines()
        .collect::<Result<Vec<String>, io::Error>>()?;
    entries_from_str_iter(file, prefix)
}
