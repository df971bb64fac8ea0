//! # weft
//!
//! A style cascade and selector-matching engine for retained node trees.
//!
//! weft compiles style sheets (selector keys mapped to property/value
//! declarations) into bucketed rule tables, matches rules against nodes, and
//! computes one flattened property map per node. Merged styles are cached per
//! node and recomputed incrementally: an edit on one axis (inline style,
//! classes, id) only re-matches that axis, and ancestor class/id changes
//! re-evaluate descendant rules over opted-in subtrees.
//!
//! ## Core Systems
//!
//! - **[`css`]**: Selector compiler, rule tables, matcher, cascade, invalidation
//! - **[`engine`]**: [`StyleEngine`], owning sheets, rules and per-node state
//! - **[`dom`]**: Slotmap-backed node arena implementing [`css::StyleTree`]
//! - **[`document`]**: [`Document`], a tree plus engine plus sink that restyles on every edit
//! - **[`config`]**: Engine tunables
//!
//! ## Example
//!
//! ```
//! use weft::{Document, NodeData, SheetSource};
//!
//! let mut doc = Document::headless();
//! let root = doc.insert_root(NodeData::new("div").with_id("app"));
//! let sheet = SheetSource::new()
//!     .rule("div", [("color", "black")])
//!     .rule("#app .title", [("color", "red")]);
//! doc.register_sheet("main", &sheet, true, root);
//!
//! let title = doc.insert_child(root, NodeData::new("span").with_class("title"));
//! assert_eq!(doc.computed_style(title).and_then(|s| s.get("color")), Some("red"));
//! ```

pub mod config;
pub mod css;
pub mod dom;
pub mod engine;
pub mod document;

pub use config::EngineConfig;
pub use css::{MergedStyle, SheetSource, StyleSink};
pub use document::Document;
pub use dom::{Dom, NodeData, NodeId};
pub use engine::{CascadeStats, StyleEngine};

// Proc macros (feature-gated)
#[cfg(feature = "macros")]
pub use weft_macros::sheet;
