//! Convenience re-exports: `use idlist::prelude::*;` pulls in the types
//! most callers need without naming every module.

pub use crate::error::ListError;
pub use crate::identifier::Identifier;
pub use crate::list::{Bias, IdentifierList, KnownView};
pub use crate::saved::SavedRecord;
