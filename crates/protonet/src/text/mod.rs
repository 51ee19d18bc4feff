//! Protobuf text-format codec (lexer, parser, printer).

mod lexer;
mod message;
mod parser;
mod printer;

pub use lexer::ParseError;
pub use message::{Field, Message, Value};
pub use parser::{Parser, ParserConfig};
pub use printer::{escape, write_message};
