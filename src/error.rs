use std::{convert::From, fmt};

/// Simple custom Error for the opcode table generator
pub struct Error {
    pub kind: ErrorKind,
    /// physical line (manual or intermediate table) the error was found on
    pub line: Option<usize>,
    pub msg: String,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ErrorKind {
    /// no operand segmentation could be recovered for a manual line
    Recognition,
    /// malformed line in the intermediate table
    Table,
    /// duplicate or out-of-range key while building the opcode map
    Consistency,
    /// a documented exception rewrite didn't find the operand it expects
    Exception,
    /// an operand the emitter can't turn into source code
    Emit,
    /// underlying io error
    IO,
    /// catch-all for other errors
    General,
}

impl Error {
    pub fn new(kind: ErrorKind, line: Option<usize>, message: &str) -> Error {
        Error {
            kind,
            line,
            msg: String::from(message),
        }
    }
    /// Attach a line number unless the error already carries one.
    pub fn at_line(mut self, line: usize) -> Error {
        self.line.get_or_insert(line);
        self
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self { Error::new(ErrorKind::IO, None, e.to_string().as_str()) }
}
impl From<std::num::ParseIntError> for Error {
    fn from(e: std::num::ParseIntError) -> Self { Error::new(ErrorKind::Table, None, e.to_string().as_str()) }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {:?}: {}", red!("opgen::Error"), self.kind, self)
    }
}
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(line) = self.line {
            write!(f, "line {}: ", line)?;
        }
        write!(f, "{}", self.msg)
    }
}
impl std::error::Error for Error {}
