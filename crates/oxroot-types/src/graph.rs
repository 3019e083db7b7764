use oxroot_wire::ObjectRef;

use crate::value::{Record, Value};
use crate::warning::DecodeWarning;

static NULL: Value = Value::Null;

/// Arena holding every object reached through a pointer.
///
/// A slot is reserved before the object's fields are read so a pointer
/// back to an object that is still being decoded resolves to the same
/// slot. That is what turns a cyclic object graph into a finite value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectGraph {
    slots: Vec<Value>,
}

impl ObjectGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve an empty (`Null`) slot and return its handle.
    #[allow(clippy::cast_possible_truncation)]
    pub fn reserve(&mut self) -> ObjectRef {
        self.slots.push(Value::Null);
        ObjectRef((self.slots.len() - 1) as u32)
    }

    /// Store the finished value for a reserved slot.
    pub fn fill(&mut self, slot: ObjectRef, value: Value) {
        if let Some(s) = self.slots.get_mut(slot.index()) {
            *s = value;
        }
    }

    /// Reserve and fill in one step.
    pub fn insert(&mut self, value: Value) -> ObjectRef {
        let slot = self.reserve();
        self.fill(slot, value);
        slot
    }

    #[must_use]
    pub fn get(&self, slot: ObjectRef) -> Option<&Value> {
        self.slots.get(slot.index())
    }

    /// Follow `value` through at most one reference.
    #[must_use]
    pub fn resolve<'v>(&'v self, value: &'v Value) -> &'v Value {
        match value {
            Value::Ref(r) => self.get(*r).unwrap_or(&NULL),
            other => other,
        }
    }

    /// The record behind `value`, whether inline or referenced.
    #[must_use]
    pub fn record<'v>(&'v self, value: &'v Value) -> Option<&'v Record> {
        self.resolve(value).as_record()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Result of decoding one top-level object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodedObject {
    pub graph: ObjectGraph,
    pub root: Value,
    /// Recoverable problems absorbed while decoding.
    pub diagnostics: Vec<DecodeWarning>,
}

impl DecodedObject {
    /// The root as a record, following a root-level reference.
    #[must_use]
    pub fn root_record(&self) -> Option<&Record> {
        self.graph.record(&self.root)
    }

    /// Resolve any value of this object through its arena.
    #[must_use]
    pub fn resolve<'v>(&'v self, value: &'v Value) -> &'v Value {
        self.graph.resolve(value)
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_slot_can_point_to_itself() {
        let mut g = ObjectGraph::new();
        let slot = g.reserve();
        let mut r = Record::new("Node");
        r.set("next", Value::Ref(slot));
        g.fill(slot, r.into());

        let reference = Value::Ref(slot);
        let node = g.record(&reference).unwrap();
        assert_eq!(node.get("next"), Some(&Value::Ref(slot)));
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn dangling_ref_resolves_to_null() {
        let g = ObjectGraph::new();
        assert!(g.resolve(&Value::Ref(ObjectRef(3))).is_null());
    }
}
