/*!
 * Translatable segments: extraction from a tree, filtering, integrity
 * checks on translations and application back into the tree.
 */

pub mod applier;
pub mod extractor;
pub mod filter;
pub mod integrity;
pub mod markup;

pub use applier::{ApplyReport, apply};
pub use extractor::{Extractor, Segment, segment_id};
pub use filter::{FilterConfig, FilterContext, FilterPolicy, FilterRule};
pub use integrity::IntegrityPolicy;
