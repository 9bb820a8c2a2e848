pub mod campaign;
pub mod entities;
pub mod error;
pub mod keys;
pub mod links;
pub mod record;

pub use campaign::*;
pub use entities::*;
pub use error::*;
pub use links::*;
pub use record::*;
