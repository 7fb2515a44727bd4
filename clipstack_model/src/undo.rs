//! Undo journal. Every destructive step a paste performs registers here
//! independently, so a failure partway through a sequence leaves the earlier
//! steps recorded and reversible.

use clipstack_ids::ObjectId;

use crate::object::EngineObject;
use crate::property::PropertyValue;

#[derive(Clone, Debug)]
pub enum UndoStep {
    CreatedObject(ObjectId),
    AddedComponent {
        node: ObjectId,
        component: ObjectId,
    },
    DestroyedComponent {
        node: ObjectId,
        snapshot: Box<EngineObject>,
    },
    PropertyChanged {
        object: ObjectId,
        name: String,
        previous: PropertyValue,
    },
}

#[derive(Default)]
pub struct UndoJournal {
    steps: Vec<UndoStep>,
}

impl UndoJournal {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn record(&mut self, step: UndoStep) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[UndoStep] {
        &self.steps
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }
}
