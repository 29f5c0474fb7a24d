mod assignment;
pub use assignment::*;
mod generation;
pub use generation::*;
mod instance;
pub use instance::*;
mod store;
pub use store::*;
