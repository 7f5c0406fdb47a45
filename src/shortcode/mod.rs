/*!
 * Shortcode markup handling.
 *
 * - `node`: the tree data model (shortcodes, text, raw spans, placeholders)
 * - `parser`: text to tree, with structural error reporting
 * - `serializer`: tree back to text, byte-identical for untouched parts
 */

pub mod node;
pub mod parser;
pub mod serializer;

pub use node::{Attribute, AttributeValue, Node, Placeholder, PlaceholderState, Quote, ShortcodeNode, Tree};
pub use parser::{ParserOptions, parse, parse_with};
pub use serializer::{serialize, serialize_node};
