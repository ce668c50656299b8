//! Building the opcode map from the entries of the intermediate table.
//!
//! The map has 256 primary slots. One of them, the prefix byte, doesn't hold
//! an instruction but a second table of 256 slots for the two-byte
//! instructions that start with it. Entries are keyed so that 0x00..=0xff
//! address the primary slots and 0x100..=0x1ff the prefixed ones.
//!
//! Two things happen to entries on the way in. A handful of subsections get
//! their operands rewritten (see [EXCEPTIONS]), and instructions with a
//! generic bit-index operand are expanded into one instruction per bit.

use super::table::{Provenance, TableEntry};
use super::token;
use super::*;

use std::collections::BTreeMap;
use std::fmt::{self, Display};

/// base address of the high memory page the `LD A,(C)` family reaches into
pub const HIGH_MEMORY_BASE: &str = "$FF00";
/// a bit-indexed instruction stands for this many concrete ones
pub const BITS_PER_FAMILY: u16 = 8;

type Rewrite = fn(&mut TableEntry) -> Result<(), Error>;

/// Operand rewrites keyed by the (section, subsection) they apply to. The
/// manual writes these instructions in shorthand the generated code can't use
/// as is.
pub const EXCEPTIONS: [(&str, &str, Rewrite); 1] = [("3.3.1.", "5.", offset_high_register)];

fn exception_for(p: &Provenance) -> Option<Rewrite> {
    let (section, subsection) = (p.section.as_deref()?, p.subsection.as_deref()?);
    EXCEPTIONS
        .iter()
        .find(|(sec, sub, _)| *sec == section && *sub == subsection)
        .map(|(_, _, rewrite)| *rewrite)
}

/// `C` as an address is shorthand for `$FF00+C`.
pub fn offset_high_register(entry: &mut TableEntry) -> Result<(), Error> {
    let mut rewritten = 0;
    for op in entry.operands.iter_mut() {
        let new_op = match op.as_str() {
            "C" => format!("{}+C", HIGH_MEMORY_BASE),
            "(C)" | "(C" => format!("({}+{}", HIGH_MEMORY_BASE, &op[1..]),
            _ => continue,
        };
        *op = new_op;
        rewritten += 1;
    }
    if rewritten == 0 {
        return Err(exception_err!(
            "{} {} has no C operand to offset",
            entry.mnemonic,
            entry.operands.join(",")
        ));
    }
    Ok(())
}

/// Expand a family of bit-indexed entries sharing a mnemonic. Each entry
/// becomes 8, one per bit; bit `i` of an entry with key `k` lands at
/// `k + i * family size`, which is how the opcode space interleaves them.
pub fn expand_bit_family(family: &[TableEntry]) -> Result<Vec<TableEntry>, Error> {
    let stride = family.len() as u16;
    let mut expanded = Vec::with_capacity(family.len() * BITS_PER_FAMILY as usize);
    for entry in family {
        for bit in 0..BITS_PER_FAMILY {
            let key = stride
                .checked_mul(bit)
                .and_then(|offset| entry.key.checked_add(offset))
                .ok_or_else(|| consistency_err!("bit {} of {} overflows the opcode space", bit, entry.mnemonic))?;
            let mut e = entry.clone();
            e.key = key;
            e.operands = entry
                .operands
                .iter()
                .map(|op| if op == token::BIT_INDEX { bit.to_string() } else { op.clone() })
                .collect();
            expanded.push(e);
        }
    }
    Ok(expanded)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub mnemonic: String,
    pub widened: bool,
    pub operands: Vec<String>,
    pub cycles: u32,
    pub key: u16,
    pub provenance: Provenance,
    pub line: usize,
}
impl From<TableEntry> for Instruction {
    fn from(e: TableEntry) -> Self {
        Instruction {
            mnemonic: e.mnemonic,
            widened: e.widened,
            operands: e.operands,
            cycles: e.cycles,
            key: e.key,
            provenance: e.provenance,
            line: e.line,
        }
    }
}
impl Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.mnemonic, self.operands.join(","))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Instruction(Instruction),
    Prefixed(BTreeMap<u8, Instruction>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpcodeMap {
    prefix: u8,
    slots: BTreeMap<u8, Slot>,
}
impl OpcodeMap {
    pub fn new(prefix: u8) -> Self {
        OpcodeMap {
            prefix,
            slots: BTreeMap::new(),
        }
    }
    pub fn prefix(&self) -> u8 { self.prefix }

    pub fn insert(&mut self, instr: Instruction) -> Result<(), Error> {
        let line = instr.line;
        let (slot, op) = match instr.key {
            0x000..=0x0ff => (instr.key as u8, None),
            0x100..=0x1ff => (self.prefix, Some((instr.key & 0xff) as u8)),
            key => {
                return Err(consistency_err!("{} has key {:#x}, outside the opcode space", instr, key).at_line(line))
            }
        };
        let occupied = |existing: &Instruction, instr: &Instruction| {
            consistency_err!(
                "{:#05x} assigned twice: {} (table line {}) and {} [{}]",
                instr.key,
                existing,
                existing.line,
                instr,
                instr.provenance
            )
            .at_line(line)
        };
        match (self.slots.get_mut(&slot), op) {
            (None, None) => {
                self.slots.insert(slot, Slot::Instruction(instr));
            }
            (None, Some(op)) => {
                self.slots.insert(slot, Slot::Prefixed(BTreeMap::from([(op, instr)])));
            }
            (Some(Slot::Instruction(existing)), None) => return Err(occupied(existing, &instr)),
            (Some(Slot::Instruction(existing)), Some(_)) => {
                return Err(consistency_err!(
                    "{} needs prefix {:#04x} but {} already occupies it",
                    instr,
                    self.prefix,
                    existing
                )
                .at_line(line))
            }
            (Some(Slot::Prefixed(_)), None) => {
                return Err(consistency_err!("{} lands on prefix byte {:#04x}", instr, self.prefix).at_line(line))
            }
            (Some(Slot::Prefixed(table)), Some(op)) => {
                if let Some(existing) = table.get(&op) {
                    return Err(occupied(existing, &instr));
                }
                table.insert(op, instr);
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn get(&self, key: u16) -> Option<&Instruction> {
        match (key, self.slots.get(&((key & 0xff) as u8))) {
            (0x000..=0x0ff, Some(Slot::Instruction(i))) => Some(i),
            (0x100..=0x1ff, _) => match self.slots.get(&self.prefix)? {
                Slot::Prefixed(table) => table.get(&((key & 0xff) as u8)),
                Slot::Instruction(_) => None,
            },
            _ => None,
        }
    }

    /// Single-byte instructions in opcode order.
    pub fn primary(&self) -> impl Iterator<Item = (u8, &Instruction)> {
        self.slots.iter().filter_map(|(&op, slot)| match slot {
            Slot::Instruction(i) => Some((op, i)),
            Slot::Prefixed(_) => None,
        })
    }
    /// Prefixed instructions in order of their second byte.
    pub fn prefixed(&self) -> impl Iterator<Item = (u8, &Instruction)> {
        self.slots
            .get(&self.prefix)
            .into_iter()
            .filter_map(|slot| match slot {
                Slot::Prefixed(table) => Some(table.iter().map(|(&op, i)| (op, i))),
                Slot::Instruction(_) => None,
            })
            .flatten()
    }
    pub fn len(&self) -> usize { self.primary().count() + self.prefixed().count() }
}

/// A listing of the map, one instruction per line:
/// `7F     LD A,A            4  [3.3.1. 2.]`
impl Display for OpcodeMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = |f: &mut fmt::Formatter<'_>, code: String, i: &Instruction| {
            writeln!(
                f,
                "{:<6} {:<18}{:>3}  [{}]",
                code,
                format!("{}{} {}", i.mnemonic, if i.widened { "*" } else { "" }, i.operands.join(",")),
                i.cycles,
                i.provenance
            )
        };
        for (op, i) in self.primary() {
            line(f, format!("{:02X}", op), i)?;
        }
        for (op, i) in self.prefixed() {
            line(f, format!("{:02X} {:02X}", self.prefix, op), i)?;
        }
        Ok(())
    }
}

/// Build the opcode map from table entries. Exceptions are applied first,
/// bit-indexed families are set aside and expanded once every entry has been
/// seen, and any key assigned twice is an error.
pub fn build<I: IntoIterator<Item = TableEntry>>(entries: I, prefix: u8) -> Result<OpcodeMap, Error> {
    let mut map = OpcodeMap::new(prefix);
    let mut families: BTreeMap<String, Vec<TableEntry>> = BTreeMap::new();
    for mut entry in entries {
        let line = entry.line;
        if let Some(rewrite) = exception_for(&entry.provenance) {
            rewrite(&mut entry).map_err(|e| e.at_line(line))?;
        }
        if entry.operands.iter().any(|op| op == token::BIT_INDEX) {
            families.entry(entry.tagged_mnemonic()).or_default().push(entry);
        } else {
            map.insert(entry.into())?;
        }
    }
    for (mnemonic, family) in families {
        verbose_println!("expanding {} {}-bit family entries", family.len(), mnemonic);
        for entry in expand_bit_family(&family)? {
            map.insert(entry.into())?;
        }
    }
    Ok(map)
}
