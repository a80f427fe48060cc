//! # Lumen layout compiler
//!
//! Compiles a declarative JSON layout tree, with named reusable style
//! fragments and inline `@{path}` reactive bindings, into source for two
//! rendering paradigms: a declarative tree-construction mode and an
//! imperative mode that mutates already-live view instances when backing
//! data changes.
//!
//! ## Pipeline invariants
//!
//! 1. **Style resolution is idempotent**: the `style` key is stripped
//!    before merge, so re-resolving a resolved tree is a no-op.
//! 2. **Merge is right-biased**: objects recurse key-wise, lists are
//!    replaced wholesale, component properties always beat style
//!    properties.
//! 3. **Order preservation**: fragments for one component keep the source
//!    JSON property order; later fragments may depend on side effects of
//!    earlier ones.
//! 4. **No fatal path for malformed styles or components**: degraded
//!    output with collected warnings beats aborting a multi-file run.
//!    Only a top-level JSON parse failure is fatal, and only for its file.
//! 5. **Explicit context**: every phase takes the run's `CompileContext`;
//!    there is no ambient global state.

mod assemble;
mod binding;
mod cache;
mod compile;
mod context;
mod error;
mod handlers;
mod style;
mod tree;
mod zorder;


pub use assemble::{CompiledUnit, Fragment};
pub use binding::{is_binding, BindingExpression};
pub use cache::OutputCache;
pub use compile::{compile_file, compile_files, compile_source, find_layout_files, CompiledOutput};
pub use context::{CompileContext, CompileOptions, OutputMode};
pub use error::{CompileError, CompileResult, Warning};
pub use handlers::{default_handler, dispatch, lookup, Handler, HandlerCx};
pub use style::deep_merge;
pub use tree::{ComponentNode, PropertyMap, PropertyValue};
