pub mod bvh;
pub mod error;
pub mod feature;
pub mod index;
pub mod options;

pub use error::*;
pub use feature::*;
pub use index::*;
pub use options::*;
