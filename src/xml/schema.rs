//! Declarative tag tables
//!
//! A [`SchemaTable`] maps each recognized tag name to a [`TagDef`]: the
//! attributes it accepts, the child tags it may contain, whether it must be
//! the document root, how its character data is treated, and a
//! schema-specific `kind` the document builder dispatches on. Tables are
//! built once and consulted for every opening tag.

use hashbrown::HashMap;
use std::fmt;

/// Which child tags an element accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Children {
    /// No child elements
    None,
    /// Only the listed tags
    Only(&'static [&'static str]),
    /// Any tag
    Any,
}

/// Which attributes an element accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attributes {
    /// Only the listed names (namespace declarations are always accepted)
    Only(&'static [&'static str]),
    /// Any attribute
    Any,
}

/// How character data inside an element is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextPolicy {
    /// Discarded
    Ignore,
    /// Non-blank text is an error
    Reject,
    /// Passed to the document builder
    Keep,
}

/// Definition of one tag
#[derive(Debug, Clone, Copy)]
pub struct TagDef<K: Copy> {
    /// Tag name
    pub name: &'static str,
    /// Accepted attributes
    pub attributes: Attributes,
    /// Accepted children
    pub children: Children,
    /// Must be, and may only be, the document root
    pub is_root: bool,
    /// Character data handling
    pub text: TextPolicy,
    /// Builder dispatch key
    pub kind: K,
}

impl<K: Copy> TagDef<K> {
    /// Non-root tag accepting the given attributes and children
    pub const fn new(
        name: &'static str,
        kind: K,
        attributes: Attributes,
        children: Children,
        text: TextPolicy,
    ) -> Self {
        Self {
            name,
            attributes,
            children,
            is_root: false,
            text,
            kind,
        }
    }

    /// Mark as the document root
    pub const fn root(mut self) -> Self {
        self.is_root = true;
        self
    }

    /// Whether `child` may appear directly inside this tag
    pub fn allows_child(&self, child: &str) -> bool {
        match self.children {
            Children::None => false,
            Children::Only(names) => names.contains(&child),
            Children::Any => true,
        }
    }

    /// Whether `attribute` may appear on this tag
    pub fn allows_attribute(&self, attribute: &str) -> bool {
        if attribute == "xmlns" || attribute.starts_with("xmlns:") || attribute.starts_with("xsi:")
        {
            return true;
        }
        match self.attributes {
            Attributes::Only(names) => names.contains(&attribute),
            Attributes::Any => true,
        }
    }
}

/// Structural violation found while checking a tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    /// Tag not in the table and no fallback definition
    UnknownTag {
        /// Tag name
        tag: String,
    },
    /// A root-only tag nested inside another element
    MustBeRoot {
        /// Tag name
        tag: String,
    },
    /// A non-root tag at document level
    NotRoot {
        /// Tag name
        tag: String,
    },
    /// Parent does not accept this child
    DisallowedChild {
        /// Tag name
        tag: String,
        /// Enclosing tag name
        parent: String,
    },
    /// Tag does not accept this attribute
    DisallowedAttribute {
        /// Tag name
        tag: String,
        /// Attribute name
        attribute: String,
    },
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTag { tag } => write!(f, "<{}> is not a recognized tag", tag),
            Self::MustBeRoot { tag } => write!(f, "<{}> must be the root element", tag),
            Self::NotRoot { tag } => write!(f, "<{}> cannot be a root element", tag),
            Self::DisallowedChild { tag, parent } => {
                write!(f, "<{}> cannot be a child of <{}>", tag, parent)
            }
            Self::DisallowedAttribute { tag, attribute } => {
                write!(f, "<{}> does not accept attribute {}", tag, attribute)
            }
        }
    }
}

/// Immutable tag-name to definition table
#[derive(Debug, Clone)]
pub struct SchemaTable<K: Copy + 'static> {
    defs: HashMap<&'static str, TagDef<K>>,
    fallback: Option<TagDef<K>>,
}

impl<K: Copy + 'static> SchemaTable<K> {
    /// Build a table from definitions
    pub fn new(defs: impl IntoIterator<Item = TagDef<K>>) -> Self {
        Self {
            defs: defs.into_iter().map(|d| (d.name, d)).collect(),
            fallback: None,
        }
    }

    /// Definition used for tags missing from the table
    pub fn with_fallback(mut self, def: TagDef<K>) -> Self {
        self.fallback = Some(def);
        self
    }

    /// Definition for `name`, falling back when configured
    pub fn get(&self, name: &str) -> Option<&TagDef<K>> {
        self.defs.get(name).or(self.fallback.as_ref())
    }

    /// Number of explicit definitions
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Whether the table has no explicit definitions
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Validate an opening tag against its parent's definition
    ///
    /// `parent` is `None` for the document root.
    pub fn check_open(
        &self,
        name: &str,
        parent: Option<(&str, &TagDef<K>)>,
    ) -> Result<&TagDef<K>, SchemaViolation> {
        let def = self.get(name).ok_or_else(|| SchemaViolation::UnknownTag {
            tag: name.to_string(),
        })?;
        match parent {
            None if def.is_root => Ok(def),
            None => Err(SchemaViolation::NotRoot {
                tag: name.to_string(),
            }),
            Some(_) if def.is_root => Err(SchemaViolation::MustBeRoot {
                tag: name.to_string(),
            }),
            Some((parent_name, parent_def)) => {
                if parent_def.allows_child(name) {
                    Ok(def)
                } else {
                    Err(SchemaViolation::DisallowedChild {
                        tag: name.to_string(),
                        parent: parent_name.to_string(),
                    })
                }
            }
        }
    }

    /// Validate attribute names of an opening tag
    pub fn check_attributes<'n>(
        &self,
        name: &str,
        def: &TagDef<K>,
        attributes: impl IntoIterator<Item = &'n str>,
    ) -> Result<(), SchemaViolation> {
        for attribute in attributes {
            if !def.allows_attribute(attribute) {
                return Err(SchemaViolation::DisallowedAttribute {
                    tag: name.to_string(),
                    attribute: attribute.to_string(),
                });
            }
        }
        Ok(())
    }
}
