//! Domain models for the eMedis engine.

mod candidate;
mod case;
mod defect;
mod evidence;
mod finding;
mod reference;

pub use candidate::*;
pub use case::*;
pub use defect::*;
pub use evidence::*;
pub use finding::*;
pub use reference::*;
