pub use base_graph::BaseGraph;
pub use editable_graph::EditableGraph;
pub use frozen_graph::{Component, Components, FrozenGraph};
pub use mutable_graph::MutableGraph;

mod base_graph;
mod editable_graph;
mod frozen_graph;
mod mutable_graph;
