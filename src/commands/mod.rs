pub mod parse;
pub mod score;
pub mod status;
