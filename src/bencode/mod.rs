pub mod decoder;
pub mod metainfo;
