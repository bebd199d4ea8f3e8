pub mod county;
pub mod points;
pub mod projector;
pub mod record;
pub mod source;
pub mod store;

pub use county::*;
pub use points::*;
pub use projector::*;
pub use record::*;
pub use source::*;
pub use store::*;
