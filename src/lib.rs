pub mod analyzer;
pub mod driver;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod query;
pub mod scorer;
pub mod shard_writer;
pub mod stats;
pub mod stopwords;
pub mod title_store;
pub mod xml_reader;

use std::io;

#[derive(Debug)]
pub enum Error {
    /// Wrong CLI arity: print usage, non-zero exit.
    ArgError(String),
    /// Any filesystem failure.
    IO(io::Error),
    /// Malformed XML event sequence or malformed posting line.
    ParseError(String),
    /// A query matched zero documents; not a hard error.
    EmptyResult,
    Context(String, Box<Error>),
}

impl Error {
    pub fn with_context<S>(self, msg: S) -> Error
    where
        S: Into<String>,
    {
        Error::Context(msg.into(), Box::new(self))
    }

    pub fn parse<S: Into<String>>(msg: S) -> Error {
        Error::ParseError(msg.into())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::ArgError(msg) => write!(f, "argument error: {}", msg),
            Error::IO(e) => write!(f, "io error: {}", e),
            Error::ParseError(msg) => write!(f, "parse error: {}", msg),
            Error::EmptyResult => write!(f, "empty result"),
            Error::Context(msg, inner) => write!(f, "{}: {}", msg, inner),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::IO(err)
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Error {
        Error::ParseError(format!("xml: {}", err))
    }
}

/// 1-based document id, assigned in XML encounter order after namespace filtering.
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Hash, Copy, Clone)]
#[repr(transparent)]
pub struct DocId(pub u64);

impl DocId {
    pub fn new(id: u64) -> Self {
        DocId(id)
    }
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for DocId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
