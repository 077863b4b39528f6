pub use ptd::Ptd;
pub use search::{SearchConfig, TreewidthSearch, WidthOutcome};
pub use sieve::{BlockSieve, Insertion, LayeredSieve};

pub mod ptd;
pub mod search;
pub mod sieve;
