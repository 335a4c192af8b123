pub mod analysis;
pub mod feed;
pub mod signal;
pub mod smc;

pub use analysis::*;
pub use feed::*;
pub use signal::*;
pub use smc::*;
