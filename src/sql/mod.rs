//! Safe SQL builder: identifiers from shape descriptors only, values as parameters.

mod builder;
pub mod params;
pub use builder::*;
pub use params::*;
