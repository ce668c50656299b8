use clap::Parser;
use clap_num::maybe_hex;
use lazy_static::lazy_static;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author,version,about,long_about=None)]
pub struct Args {
    /// Instruction-set manual (plain text) to extract opcodes from, or an intermediate table with --from-table
    pub file: String,

    /// Treat FILE as an (optionally hand-edited) intermediate table and skip extraction
    #[arg(short = 't', long)]
    pub from_table: bool,

    /// Where to write the intermediate table (defaults to opcodes.txt next to FILE)
    #[arg(long)]
    pub table: Option<String>,

    /// Stop after writing the intermediate table
    #[arg(short = 'x', long)]
    pub extract_only: bool,

    /// Where to write the generated dispatch source (defaults to op_cmds.rs next to FILE)
    #[arg(short, long)]
    pub out: Option<String>,

    /// Opcode byte that introduces the two-byte (prefixed) instruction space (hex ok with '0x')
    #[arg(long,value_parser=maybe_hex::<u8>, default_value_t=0xcb_u8)]
    pub prefix: u8,

    /// Dump the finished opcode map to stdout
    #[arg(short, long)]
    pub list: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

lazy_static! {
    pub static ref ARGS: Args = if cfg!(test) {
        // manually set parameters for running tests
        Args::parse_from(["test", "test/sample_manual.txt"])
    } else {
        Args::parse()
    };
}

pub const DEFAULT_TABLE_NAME: &str = "opcodes.txt";
pub const DEFAULT_OUT_NAME: &str = "op_cmds.rs";

pub fn init() {}
fn beside_input(name: &str) -> PathBuf { Path::new(&ARGS.file).with_file_name(name) }
pub fn table_path() -> PathBuf { ARGS.table.as_ref().map_or_else(|| beside_input(DEFAULT_TABLE_NAME), PathBuf::from) }
pub fn out_path() -> PathBuf { ARGS.out.as_ref().map_or_else(|| beside_input(DEFAULT_OUT_NAME), PathBuf::from) }
