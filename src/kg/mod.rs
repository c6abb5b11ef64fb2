mod graph;
mod parse;
mod source;

pub use graph::{EntityCategory, GraphPayload};
#[cfg(test)]
pub use parse::parse_graph_payload;
pub use source::{FileSource, GraphSource};
