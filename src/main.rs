//! # An opcode table generator for CPU emulators.
//!
//! Reads the instruction-set chapter of a CPU manual (plain text, as it comes
//! out of a PDF converter), extracts every instruction's operands, opcode and
//! cycle count into an intermediate table, and generates Rust dispatch code
//! from that table.
//!
//! ## Getting Started
//! ```
//! cargo run -- /path/to/manual.txt
//! ```
//! writes `opcodes.txt` and `op_cmds.rs` next to the manual. The table can be
//! inspected and corrected by hand, then turned into code on its own:
//! ```
//! opgen --from-table /path/to/opcodes.txt
//! ```
//! ## Options
//! Help for command line options is available using -h or --help.
#[macro_use]
mod macros;
mod config;
mod emit;
mod error;
mod opmap;
mod scan;
mod segment;
mod table;
mod term;
mod token;
use std::path::Path;
use std::result::Result;
pub(crate) use crate::error::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    config::init();
    term::init();
    // process_file does all the work
    if let Err(e) = process_file(Path::new(&config::ARGS.file), &config::table_path(), &config::out_path()) {
        println!("{}", e);
        return Err(Box::new(e));
    }
    Ok(())
}
/// process_file drives the top level functionality (extract, build, emit) of the app
fn process_file(input: &Path, table_path: &Path, out_path: &Path) -> Result<(), Error> {
    let table_path = if config::ARGS.from_table {
        // the input is a table from an earlier run
        input
    } else {
        info!("Scanning {}", input.display());
        let table = scan::scan_file(input)?;
        table.write_to_path(table_path)?;
        info!(
            "Wrote {} instruction records to {}",
            table.record_count(),
            table_path.display()
        );
        if config::ARGS.extract_only {
            return Ok(());
        }
        table_path
    };
    let entries = table::read_from_file(table_path, config::ARGS.prefix)?;
    info!("Read {} entries from {}", entries.len(), table_path.display());
    let map = opmap::build(entries, config::ARGS.prefix)?;
    info!("Opcode map holds {} instructions", map.len());
    if config::ARGS.list {
        print!("{}", map);
    }
    let source = input
        .file_name()
        .map_or_else(|| input.display().to_string(), |name| name.to_string_lossy().into_owned());
    emit::write_to_path(&map, &source, out_path)?;
    println!(concat!(green!("Done"), ": wrote {}"), out_path.display());
    Ok(())
}
