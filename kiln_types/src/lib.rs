//! Type resolution (C2) and conformance (C3) for the Kiln lowering core.

mod conform;
mod error;
mod registry;
mod resolver;

pub use conform::{conform, select_user_conversion, ConformMode};
pub use error::TypeError;
pub use registry::{TypeDecl, TypeRegistry};
pub use resolver::Resolver;
