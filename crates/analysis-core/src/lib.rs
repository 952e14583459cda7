pub mod coerce;
pub mod error;
pub mod snapshot;
pub mod traits;
pub mod types;

pub use error::*;
pub use snapshot::*;
pub use traits::*;
pub use types::*;
