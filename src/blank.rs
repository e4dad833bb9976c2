//! Blank instances: the default-valued writable shape of a resource.
//!
//! The blank instance seeds create and replace request bodies. It is not a
//! validated instance; unset fields are `null`.
//!
//! Rules, in priority order per node:
//!
//! | Node | Value | Key in parent object |
//! |------|-------|----------------------|
//! | read-only, array of identified items, or identified object property | empty placeholder | omitted |
//! | array | `default` or `[]` | omitted |
//! | object (or untyped with `properties`) | `default` object overlaid with property values | kept |
//! | anything else | `default` or `null` | kept |
//!
//! Arrays never appear in a parent's blank instance: a nested array is a
//! separately fetchable collection rather than an inline field.

use serde_json::{Map, Value};

use crate::types::{has_identifier, is_array, is_object_like, is_object_shaped, is_read_only};
use crate::walker::{walk, PathStep, SchemaVisitor, Walk, WalkContext};

/// Compute the blank instance for a schema.
///
/// Returns `Value::Null` for schemas with no type, properties or default.
/// The input is not modified.
pub fn blank_object(schema: &Value) -> Value {
    let mut visitor = BlankVisitor::default();
    walk(schema.clone(), &mut visitor).value
}

/// Materialized value of one node.
struct Blank {
    value: Value,
    /// Whether the node contributes a key to its parent object.
    keyed: bool,
}

/// How a node is materialized, decided before its children are walked.
enum Shape {
    /// Addressed by link or never written by clients.
    Reference,
    Array,
    Object,
    Leaf,
}

#[derive(Default)]
struct BlankVisitor {
    /// Shapes of the nodes currently being walked, innermost last.
    shapes: Vec<Shape>,
}

impl BlankVisitor {
    fn classify(schema: &Value, ctx: &WalkContext<'_>) -> Shape {
        let identified_items = is_array(schema)
            && schema
                .get("items")
                .is_some_and(has_identifier);
        let nested_resource = !ctx.is_root() && is_object_like(schema) && has_identifier(schema);

        if identified_items || nested_resource || is_read_only(schema) {
            Shape::Reference
        } else if is_array(schema) {
            Shape::Array
        } else if is_object_shaped(schema) {
            Shape::Object
        } else {
            Shape::Leaf
        }
    }
}

impl SchemaVisitor for BlankVisitor {
    type Output = Blank;

    fn enter(&mut self, schema: Value, ctx: &WalkContext<'_>) -> Walk {
        let shape = Self::classify(&schema, ctx);
        let descend = matches!(shape, Shape::Object);
        self.shapes.push(shape);
        if descend {
            Walk::Descend(schema)
        } else {
            Walk::Skip(schema)
        }
    }

    fn leave(
        &mut self,
        schema: Value,
        children: Vec<(PathStep, Blank)>,
        _ctx: &WalkContext<'_>,
    ) -> Blank {
        let default = schema.get("default").cloned();

        match self.shapes.pop() {
            Some(Shape::Reference) => Blank {
                value: placeholder(&schema),
                keyed: false,
            },
            Some(Shape::Array) => Blank {
                value: default.unwrap_or_else(|| Value::Array(Vec::new())),
                keyed: false,
            },
            Some(Shape::Object) => {
                let mut result = match default {
                    Some(Value::Object(map)) => map,
                    _ => Map::new(),
                };
                for (step, child) in children {
                    let PathStep::Property(name) = step else {
                        continue;
                    };
                    if !child.keyed {
                        continue;
                    }
                    let value = if !child.value.is_null() {
                        child.value
                    } else {
                        result
                            .get(&name)
                            .filter(|inherited| !inherited.is_null())
                            .cloned()
                            .unwrap_or(Value::Null)
                    };
                    result.insert(name, value);
                }
                Blank {
                    value: Value::Object(result),
                    keyed: true,
                }
            }
            Some(Shape::Leaf) | None => Blank {
                value: default.unwrap_or(Value::Null),
                keyed: true,
            },
        }
    }
}

/// Empty value of the node's own kind, used when it is not materialized.
fn placeholder(schema: &Value) -> Value {
    if is_array(schema) {
        Value::Array(Vec::new())
    } else if is_object_shaped(schema) {
        Value::Object(Map::new())
    } else {
        Value::Null
    }
}
