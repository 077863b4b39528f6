macro_rules! impl_setter {
    ($self:ident, $field:ident, $type:ty) => {
        pub fn $field(mut $self, $field: $type) -> Self {
            $self.$field = $field;
            $self
        }
    };
}

pub mod datastructures;
pub use datastructures::{BitSet, BitSetIterator};

pub mod error;
pub use error::{Result, TreewidthError};

pub mod exact;
pub mod graph;
pub mod io;
#[cfg(feature = "pace-logging")]
pub mod logging;
pub mod lowerbound;
pub mod oracles;
pub mod solver;
pub mod tree_decomposition;
pub mod upperbound;

pub use solver::{treewidth, SolveResult, Solver};
