mod collection;
mod document;
mod source;

#[cfg(test)]
mod test_support;

pub use collection::Collection;
pub use document::{DocSnapshot, Document};
pub use source::{OpEvent, StateSource};
