pub mod assign;
pub mod binary;
pub mod unary;
