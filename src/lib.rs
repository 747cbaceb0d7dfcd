#![doc = include_str!("../README.md")]

pub mod bitset;
pub mod error;
pub mod identifier;
pub mod leaf;
pub mod list;
pub mod node;
pub mod prelude;
pub mod saved;

pub use error::ListError;
pub use identifier::{expand, Identifier, MAX_COUNTER};
pub use list::{Bias, IdentifierList, KnownView};
pub use saved::SavedRecord;

#[cfg(feature = "json")]
pub use saved::{from_json, to_json, JsonError};

#[cfg(test)]
mod tests {}
