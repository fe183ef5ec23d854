pub mod public;
mod router;

pub use router::{relay, router};
