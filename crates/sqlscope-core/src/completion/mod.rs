//! Cursor-aware completion.
//!
//! The pipeline is split into the cursor adapter ([`cursor`]), scope building
//! ([`scope`]), context classification ([`context`]) and suggestion
//! generation ([`suggest`]); the engine wires them together per request.

pub mod context;
pub mod cursor;
mod engine;
pub mod scope;
pub mod suggest;

pub use context::{Anchor, Context};
pub use engine::{completion_context, completion_items, completion_items_json, CursorContext};
pub use scope::{BindingSource, CteDefinition, DerivedOrigin, NameResolver, Scope, TableBinding};
