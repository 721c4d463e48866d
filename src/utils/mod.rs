pub mod hex;
pub mod time;
