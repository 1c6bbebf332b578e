pub mod domain;
pub mod frame;
pub mod protocol;
