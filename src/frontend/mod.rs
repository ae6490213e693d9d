pub mod ast;
pub mod lexer;
pub mod parser;
pub mod pretty;
pub mod scanner;
pub mod token_buffer;
pub mod visitor;
