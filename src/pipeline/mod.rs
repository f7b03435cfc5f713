//! Pipeline module - season keys, feature selection, and merging

pub mod cleaning;
pub mod correlation;
pub mod driver;
pub mod loader;
pub mod merge;
pub mod missing;
pub mod season;
pub mod table;

pub use cleaning::*;
pub use correlation::*;
pub use driver::*;
pub use loader::*;
pub use merge::*;
pub use missing::*;
pub use season::*;
pub use table::*;
