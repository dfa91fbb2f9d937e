mod core;
mod ops;

pub use core::Collection;
pub use ops::ID_FIELD;
