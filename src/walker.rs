//! Two-phase schema traversal.
//!
//! [`walk`] drives a [`SchemaVisitor`] over a schema tree: [`SchemaVisitor::enter`]
//! runs pre-order and may stop descent, [`SchemaVisitor::leave`] runs post-order
//! and receives the outputs of every visited child together with the step that
//! led to it. Both hooks see a [`WalkContext`] with the steps from the root and
//! the parent node.
//!
//! Children are moved out of the node before they are walked. Their slots are
//! left holding `null` so that [`reattach`] can put a rewritten child back in
//! its original position.

use serde_json::{Map, Value};

/// Keywords whose values are maps of sub-schemas.
const MAP_KEYWORDS: &[&str] = &[
    "properties",
    "patternProperties",
    "definitions",
    "$defs",
    "dependencies",
];

/// Keywords whose values are single sub-schemas (when the value is an object).
const SINGLE_KEYWORDS: &[&str] = &["additionalProperties", "additionalItems", "not"];

/// Keywords whose values are arrays of sub-schemas.
const ARRAY_KEYWORDS: &[&str] = &["allOf", "anyOf", "oneOf"];

/// Location of a child schema relative to its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    /// `properties/<name>`
    Property(String),
    /// An entry of another map keyword, e.g. `definitions/<name>`.
    Member(&'static str, String),
    /// `items` holding a single schema.
    Items,
    /// `items/<index>` in tuple form.
    TupleItem(usize),
    /// A single-schema keyword such as `not`.
    Keyword(&'static str),
    /// `allOf/<index>` and friends.
    Branch(&'static str, usize),
}

/// Position of the node being visited.
#[derive(Debug, Clone, Copy)]
pub struct WalkContext<'a> {
    /// Steps from the root to this node. Empty for the root.
    pub path: &'a [PathStep],
    /// The parent node, with its sub-schema slots emptied.
    pub parent: Option<&'a Map<String, Value>>,
}

impl WalkContext<'_> {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// The step that led from the parent to this node.
    pub fn step(&self) -> Option<&PathStep> {
        self.path.last()
    }
}

/// Instruction returned by [`SchemaVisitor::enter`].
#[derive(Debug)]
pub enum Walk {
    /// Visit the node's sub-schemas.
    Descend(Value),
    /// Go straight to [`SchemaVisitor::leave`] with no children.
    Skip(Value),
}

/// A pre/post-order schema visitor.
pub trait SchemaVisitor {
    type Output;

    /// Called before the node's children are walked.
    fn enter(&mut self, schema: Value, ctx: &WalkContext<'_>) -> Walk;

    /// Called after all children have been walked, in document order.
    fn leave(
        &mut self,
        schema: Value,
        children: Vec<(PathStep, Self::Output)>,
        ctx: &WalkContext<'_>,
    ) -> Self::Output;
}

/// Walk `schema` with `visitor` and return the root's output.
pub fn walk<V: SchemaVisitor>(schema: Value, visitor: &mut V) -> V::Output {
    let mut path = Vec::new();
    walk_node(schema, visitor, &mut path, None)
}

fn walk_node<V: SchemaVisitor>(
    schema: Value,
    visitor: &mut V,
    path: &mut Vec<PathStep>,
    parent: Option<&Map<String, Value>>,
) -> V::Output {
    let action = visitor.enter(
        schema,
        &WalkContext {
            path: path.as_slice(),
            parent,
        },
    );

    let (schema, children) = match action {
        Walk::Skip(schema) => (schema, Vec::new()),
        Walk::Descend(Value::Object(mut node)) => {
            let slots = take_children(&mut node);
            let mut children = Vec::with_capacity(slots.len());
            for (step, child) in slots {
                path.push(step.clone());
                let output = walk_node(child, visitor, path, Some(&node));
                path.pop();
                children.push((step, output));
            }
            (Value::Object(node), children)
        }
        Walk::Descend(other) => (other, Vec::new()),
    };

    visitor.leave(
        schema,
        children,
        &WalkContext {
            path: path.as_slice(),
            parent,
        },
    )
}

/// Move every sub-schema out of `node`, leaving `null` in its slot.
fn take_children(node: &mut Map<String, Value>) -> Vec<(PathStep, Value)> {
    let mut children = Vec::new();

    for keyword in MAP_KEYWORDS {
        if let Some(Value::Object(map)) = node.get_mut(*keyword) {
            for (name, child) in map.iter_mut() {
                // Property dependencies are name lists, not schemas
                if *keyword == "dependencies" && !child.is_object() {
                    continue;
                }
                let step = if *keyword == "properties" {
                    PathStep::Property(name.clone())
                } else {
                    PathStep::Member(*keyword, name.clone())
                };
                children.push((step, std::mem::take(child)));
            }
        }
    }

    if let Some(items) = node.get_mut("items") {
        match items {
            Value::Object(_) => children.push((PathStep::Items, std::mem::take(items))),
            Value::Array(tuple) => {
                for (i, item) in tuple.iter_mut().enumerate() {
                    children.push((PathStep::TupleItem(i), std::mem::take(item)));
                }
            }
            _ => {}
        }
    }

    for keyword in SINGLE_KEYWORDS {
        if let Some(child) = node.get_mut(*keyword) {
            if child.is_object() {
                children.push((PathStep::Keyword(*keyword), std::mem::take(child)));
            }
        }
    }

    for keyword in ARRAY_KEYWORDS {
        if let Some(Value::Array(branches)) = node.get_mut(*keyword) {
            for (i, branch) in branches.iter_mut().enumerate() {
                children.push((PathStep::Branch(*keyword, i), std::mem::take(branch)));
            }
        }
    }

    children
}

/// Put a (possibly rewritten) child back into the slot it was taken from.
pub fn reattach(node: &mut Map<String, Value>, step: PathStep, child: Value) {
    let slot = match &step {
        PathStep::Property(name) => node
            .get_mut("properties")
            .and_then(|props| props.get_mut(name.as_str())),
        PathStep::Member(keyword, name) => node
            .get_mut(*keyword)
            .and_then(|map| map.get_mut(name.as_str())),
        PathStep::Items => node.get_mut("items"),
        PathStep::TupleItem(i) => node.get_mut("items").and_then(|items| items.get_mut(*i)),
        PathStep::Keyword(keyword) => node.get_mut(*keyword),
        PathStep::Branch(keyword, i) => node
            .get_mut(*keyword)
            .and_then(|branches| branches.get_mut(*i)),
    };
    if let Some(slot) = slot {
        *slot = child;
    }
}
