pub mod key;
pub mod status;
pub mod switch;
