//! Node types: NodeId, NodeData.

use slotmap::new_key_type;

use crate::css::model::DeclarationBlock;

new_key_type! {
    /// Unique identifier for a DOM node. Copy, lightweight (u64).
    pub struct NodeId;
}

/// Data associated with a single DOM node.
#[derive(Debug, Clone)]
pub struct NodeData {
    /// Tag name (`div`, `text`, ...).
    pub tag: String,
    /// Optional id attribute (`#id` selector).
    pub id: Option<String>,
    /// Class list (`.class` selector), without duplicates.
    pub classes: Vec<String>,
    /// The node's own style declarations.
    pub inline_style: DeclarationBlock,
    /// `false` for logical wrappers that produce no output; they are skipped
    /// when walking render ancestors.
    pub render_capable: bool,
    /// Opt-in: class/id changes on this node restyle descendant-rule matches
    /// in its subtree.
    pub restyle_descendants: bool,
}

impl NodeData {
    /// Create a render-capable node with the given tag and no attributes.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            id: None,
            classes: Vec::new(),
            inline_style: DeclarationBlock::new(),
            render_capable: true,
            restyle_descendants: false,
        }
    }

    /// A logical wrapper node (not render-capable).
    pub fn wrapper(tag: impl Into<String>) -> Self {
        Self {
            render_capable: false,
            ..Self::new(tag)
        }
    }

    /// Set the id (builder).
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add a single class (builder).
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        let class = class.into();
        if !self.classes.contains(&class) {
            self.classes.push(class);
        }
        self
    }

    /// Add multiple classes (builder).
    pub fn with_classes(mut self, classes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        for class in classes {
            let class = class.into();
            if !self.classes.contains(&class) {
                self.classes.push(class);
            }
        }
        self
    }

    /// Set one inline style property (builder).
    pub fn with_style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.inline_style.insert(property.into(), value.into());
        self
    }

    /// Opt this node's subtree into descendant restyling (builder).
    pub fn restyle_descendants(mut self, enabled: bool) -> Self {
        self.restyle_descendants = enabled;
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Replace the class list, dropping duplicates.
    pub fn set_classes(&mut self, classes: impl IntoIterator<Item = impl Into<String>>) {
        self.classes.clear();
        for class in classes {
            let class = class.into();
            if !self.classes.contains(&class) {
                self.classes.push(class);
            }
        }
    }
}
