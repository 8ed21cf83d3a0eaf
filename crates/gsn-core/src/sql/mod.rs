mod lexer;
mod rewrite;

pub use lexer::{Token, tokenize};
pub use rewrite::{conjoin_where, rename_tables};
