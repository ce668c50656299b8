//! Generating Rust dispatch code from the opcode map.
//!
//! Every instruction becomes a handler that calls the emulator's command
//! function for its mnemonic with one `CmdInp` per operand, and returns the
//! instruction's cycle count:
//! ```text
//! fn op_7e(mother: &mut Motherboard) -> u8 {
//!     ld(mother, CmdInp::new(RegExt::Reg(Reg::A), false, 0), CmdInp::new(RegExt::Reg(Reg::HL), true, 0));
//!     8
//! }
//! ```
//! Two static tables of 256 optional handlers, one for single-byte opcodes
//! and one for the prefixed space, and an `exe_op` lookup finish the file.
//! The generated code expects the emulator to provide `crate::cmd`,
//! `crate::cpu::{Flag, Reg}` and `crate::motherboard::Motherboard`.

use super::opmap::{Instruction, OpcodeMap};
use super::token::{self, Token};
use super::*;

use std::fs::File;
use std::io;
use std::path::Path;

/// register names the emulator's `Reg` enum knows
pub const REGISTERS: [&str; 14] = ["A", "B", "C", "D", "E", "F", "H", "L", "AF", "BC", "DE", "HL", "SP", "PC"];
/// flag names the emulator's `Flag` enum knows
pub const FLAGS: [&str; 4] = ["Z", "N", "H", "C"];

/// Map an operand name (parentheses and offset already stripped) to a
/// `RegExt` expression. Only widened instructions take condition flags.
fn reg_ext(reg: &str, widened: bool) -> Result<String, Error> {
    if widened {
        if let Some(flag) = reg.strip_prefix('N').filter(|f| FLAGS.contains(f)) {
            return Ok(format!("RegExt::NFlag(Flag::{})", flag));
        }
        if FLAGS.contains(&reg) {
            return Ok(format!("RegExt::Flag(Flag::{})", reg));
        }
    }
    if !reg.is_empty() && reg.chars().all(|c| c.is_ascii_digit()) {
        return Ok(format!("RegExt::B({})", reg));
    }
    if let Some(value) = reg
        .strip_suffix('H')
        .filter(|digits| !digits.is_empty())
        .and_then(|digits| u8::from_str_radix(digits, 16).ok())
    {
        return Ok(format!("RegExt::H({:#04x})", value));
    }
    match reg {
        "n" => Ok("RegExt::N".to_string()),
        "nn" => Ok("RegExt::NN".to_string()),
        _ if REGISTERS.contains(&reg) => Ok(format!("RegExt::Reg(Reg::{})", reg)),
        _ => Err(emit_err!("no RegExt for operand \"{}\"", reg)),
    }
}

/// Parse the address part of `base+reg`. `$` marks hex.
fn offset(base: &str) -> Option<u16> {
    match base.strip_prefix('$') {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => base.parse().ok(),
    }
}

/// Render one operand as a `CmdInp::new(..)` expression. A parenthesized
/// operand is a memory access; `base+reg` adds a fixed offset to the register.
pub fn render_operand(op: &str, widened: bool) -> Result<String, Error> {
    let (body, indirect) = match (token::indirect(op), op.strip_prefix('(')) {
        (Some(Token::Indirect { inner, .. }), _) => (inner, true),
        // unclosed
        (_, Some(rest)) => (rest, true),
        _ => (op, false),
    };
    let (change, reg) = match body.split_once('+') {
        Some((base, reg)) => (
            offset(base).ok_or_else(|| emit_err!("bad offset \"{}\" in operand \"{}\"", base, op))?,
            reg,
        ),
        None => (0, body),
    };
    let change = if change == 0 { "0".to_string() } else { format!("{:#06x}", change) };
    Ok(format!("CmdInp::new({}, {}, {})", reg_ext(reg, widened)?, indirect, change))
}

/// Name of the command function an instruction calls.
fn command_name(i: &Instruction) -> String {
    let name = i.mnemonic.to_lowercase();
    if i.widened {
        name + "_flag"
    } else {
        name
    }
}

fn handler_name(prefix: Option<u8>, op: u8) -> String {
    match prefix {
        Some(p) => format!("op_{:02x}_{:02x}", p, op),
        None => format!("op_{:02x}", op),
    }
}

fn write_handler(name: &str, i: &Instruction, out: &mut dyn io::Write) -> Result<(), Error> {
    let mut args = vec!["mother".to_string()];
    for op in &i.operands {
        args.push(render_operand(op, i.widened).map_err(|e| e.at_line(i.line))?);
    }
    writeln!(out, "// {} [{}]", i, i.provenance)?;
    writeln!(out, "fn {}(mother: &mut Motherboard) -> u8 {{", name)?;
    writeln!(out, "    {}({});", command_name(i), args.join(", "))?;
    writeln!(out, "    {}", i.cycles)?;
    writeln!(out, "}}")?;
    Ok(())
}

fn write_table<'a, I>(name: &str, prefix: Option<u8>, ops: I, out: &mut dyn io::Write) -> Result<(), Error>
where
    I: Iterator<Item = (u8, &'a Instruction)>,
{
    writeln!(out, "pub static {}: [Option<CmdFn>; 256] = {{", name)?;
    writeln!(out, "    let mut table: [Option<CmdFn>; 256] = [None; 256];")?;
    for (op, _) in ops {
        writeln!(out, "    table[{:#04x}] = Some({});", op, handler_name(prefix, op))?;
    }
    writeln!(out, "    table")?;
    writeln!(out, "}};")?;
    Ok(())
}

/// Write the dispatch module for `map` to `out`. `source` names the input
/// the map was built from and only appears in the header comment.
pub fn write_dispatch(map: &OpcodeMap, source: &str, out: &mut dyn io::Write) -> Result<(), Error> {
    let prefix = map.prefix();
    writeln!(out, "// Generated by opgen from {}. Do not edit.", source)?;
    writeln!(out, "#![allow(unused_imports)]")?;
    writeln!(out)?;
    writeln!(out, "use crate::cmd::*;")?;
    writeln!(out, "use crate::cpu::{{Flag, Reg}};")?;
    writeln!(out, "use crate::motherboard::Motherboard;")?;
    writeln!(out)?;
    writeln!(out, "pub type CmdFn = fn(&mut Motherboard) -> u8;")?;
    writeln!(out, "pub const PREFIX: u8 = {:#04x};", prefix)?;

    for (op, i) in map.primary() {
        writeln!(out)?;
        write_handler(&handler_name(None, op), i, out)?;
    }
    for (op, i) in map.prefixed() {
        writeln!(out)?;
        write_handler(&handler_name(Some(prefix), op), i, out)?;
    }

    writeln!(out)?;
    write_table("PRIMARY", None, map.primary(), out)?;
    write_table("PREFIXED", Some(prefix), map.prefixed(), out)?;

    writeln!(out)?;
    writeln!(out, "/// Run the instruction for `op`, returning its cycle count, or None if")?;
    writeln!(out, "/// the opcode isn't assigned.")?;
    writeln!(
        out,
        "pub fn exe_op(mother: &mut Motherboard, prefix: Option<u8>, op: u8) -> Option<u8> {{"
    )?;
    writeln!(out, "    let table = match prefix {{")?;
    writeln!(out, "        None => &PRIMARY,")?;
    writeln!(out, "        Some(PREFIX) => &PREFIXED,")?;
    writeln!(out, "        Some(_) => return None,")?;
    writeln!(out, "    }};")?;
    writeln!(out, "    table[op as usize].map(|cmd| cmd(mother))")?;
    writeln!(out, "}}")?;
    Ok(())
}

pub fn write_to_path(map: &OpcodeMap, source: &str, path: &Path) -> Result<(), Error> {
    let mut file = io::BufWriter::new(File::create(path)?);
    write_dispatch(map, source, &mut file)?;
    io::Write::flush(&mut file)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opmap;
    use crate::table::{Provenance, TableEntry};

    fn entry(mnemonic: &str, widened: bool, operands: &[&str], key: u16, cycles: u32) -> TableEntry {
        TableEntry {
            provenance: Provenance {
                section: Some("3.3.1.".to_string()),
                subsection: Some("2.".to_string()),
            },
            mnemonic: mnemonic.to_string(),
            widened,
            operands: operands.iter().map(|s| s.to_string()).collect(),
            key,
            cycles,
            line: 1,
        }
    }

    #[test]
    fn operands() -> Result<(), Error> {
        assert_eq!(render_operand("A", false)?, "CmdInp::new(RegExt::Reg(Reg::A), false, 0)");
        assert_eq!(render_operand("(HL)", false)?, "CmdInp::new(RegExt::Reg(Reg::HL), true, 0)");
        assert_eq!(render_operand("n", false)?, "CmdInp::new(RegExt::N, false, 0)");
        assert_eq!(render_operand("(nn)", false)?, "CmdInp::new(RegExt::NN, true, 0)");
        assert_eq!(render_operand("3", false)?, "CmdInp::new(RegExt::B(3), false, 0)");
        assert_eq!(render_operand("38H", false)?, "CmdInp::new(RegExt::H(0x38), false, 0)");
        assert_eq!(
            render_operand("($FF00+C)", false)?,
            "CmdInp::new(RegExt::Reg(Reg::C), true, 0xff00)"
        );
        // an unclosed parenthesis still reads as indirect
        assert_eq!(
            render_operand("($FF00+C", false)?,
            "CmdInp::new(RegExt::Reg(Reg::C), true, 0xff00)"
        );
        assert_eq!(render_operand("16+n", false)?, "CmdInp::new(RegExt::N, false, 0x0010)");
        Ok(())
    }
    #[test]
    fn flags_only_when_widened() -> Result<(), Error> {
        assert_eq!(render_operand("NZ", true)?, "CmdInp::new(RegExt::NFlag(Flag::Z), false, 0)");
        assert_eq!(render_operand("NC", true)?, "CmdInp::new(RegExt::NFlag(Flag::C), false, 0)");
        assert_eq!(render_operand("Z", true)?, "CmdInp::new(RegExt::Flag(Flag::Z), false, 0)");
        assert_eq!(render_operand("C", true)?, "CmdInp::new(RegExt::Flag(Flag::C), false, 0)");
        assert_eq!(render_operand("nn", true)?, "CmdInp::new(RegExt::NN, false, 0)");
        assert_eq!(render_operand("C", false)?, "CmdInp::new(RegExt::Reg(Reg::C), false, 0)");
        assert_eq!(render_operand("NZ", false).unwrap_err().kind, ErrorKind::Emit);
        Ok(())
    }
    #[test]
    fn unknown_operands_are_fatal() {
        assert_eq!(render_operand("r", false).unwrap_err().kind, ErrorKind::Emit);
        assert_eq!(render_operand("(HL+)", false).unwrap_err().kind, ErrorKind::Emit);
        assert_eq!(render_operand("$XY+C", false).unwrap_err().kind, ErrorKind::Emit);
        assert_eq!(render_operand("", false).unwrap_err().kind, ErrorKind::Emit);
    }
    #[test]
    fn dispatch_module() -> Result<(), Error> {
        let map = opmap::build(
            [
                entry("LD", false, &["A", "(HL)"], 0x7e, 8),
                entry("NOP", false, &[], 0x00, 4),
                entry("JP", true, &["NZ", "nn"], 0xc2, 12),
                entry("SWAP", false, &["A"], 0x137, 8),
            ],
            0xcb,
        )?;
        let mut buf: Vec<u8> = Vec::new();
        write_dispatch(&map, "manual.txt", &mut buf)?;
        let src = String::from_utf8(buf).unwrap();

        assert!(src.starts_with("// Generated by opgen from manual.txt."));
        assert!(src.contains("pub const PREFIX: u8 = 0xcb;"));
        assert!(src.contains(
            "fn op_7e(mother: &mut Motherboard) -> u8 {\n    \
             ld(mother, CmdInp::new(RegExt::Reg(Reg::A), false, 0), CmdInp::new(RegExt::Reg(Reg::HL), true, 0));\n    \
             8\n}"
        ));
        assert!(src.contains("fn op_00(mother: &mut Motherboard) -> u8 {\n    nop(mother);\n    4\n}"));
        assert!(src.contains("    jp_flag(mother, CmdInp::new(RegExt::NFlag(Flag::Z), false, 0), CmdInp::new(RegExt::NN, false, 0));"));
        assert!(src.contains("fn op_cb_37(mother: &mut Motherboard) -> u8 {"));
        assert!(src.contains("    table[0x7e] = Some(op_7e);"));
        assert!(src.contains("    table[0x37] = Some(op_cb_37);"));
        // handlers come out in opcode order
        let nop = src.find("fn op_00").unwrap();
        let ld = src.find("fn op_7e").unwrap();
        let jp = src.find("fn op_c2").unwrap();
        let swap = src.find("fn op_cb_37").unwrap();
        assert!(nop < ld && ld < jp && jp < swap);
        Ok(())
    }
    #[test]
    fn bad_operand_reports_table_line() -> Result<(), Error> {
        let mut e = entry("LD", false, &["A", "r"], 0x7f, 4);
        e.line = 42;
        let map = opmap::build([e], 0xcb)?;
        let mut buf: Vec<u8> = Vec::new();
        let err = write_dispatch(&map, "manual.txt", &mut buf).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Emit);
        assert_eq!(err.line, Some(42));
        Ok(())
    }
}
