// Core modules implementing line reading, table parsing, transposition, and error modeling.
pub mod error;
pub mod line;
pub mod matfile;
pub mod number;
pub mod table;
pub mod text_table;
pub mod tokens;
pub mod transpose;
