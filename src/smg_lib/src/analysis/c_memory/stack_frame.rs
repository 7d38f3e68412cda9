use crate::prelude::*;
use crate::smg::SmgObject;
use std::collections::BTreeMap;

/// The activation record of one function call.
///
/// A frame holds the local-variable objects of the call, keyed by variable name,
/// and an optional return-value object that is created when the frame is pushed
/// (absent for `void` functions).
/// Frames are owned by the C-aware graph and form a last-in/first-out call stack.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct StackFrame {
    function_name: String,
    variables: BTreeMap<String, SmgObject>,
    return_object: Option<SmgObject>,
}

impl StackFrame {
    /// Create a frame for a call of the named function.
    pub(super) fn new(
        function_name: impl Into<String>,
        return_object: Option<SmgObject>,
    ) -> StackFrame {
        StackFrame {
            function_name: function_name.into(),
            variables: BTreeMap::new(),
            return_object,
        }
    }

    /// Register a local-variable object under its label.
    /// The caller must not register two variables with the same name in one frame.
    pub(super) fn add_variable(&mut self, object: SmgObject) {
        debug_assert!(
            !self.variables.contains_key(object.label()),
            "variable {} is already declared in this frame",
            object.label()
        );
        self.variables.insert(object.label().to_string(), object);
    }

    /// The name of the function this frame belongs to.
    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    /// Look up a local variable by name.
    pub fn variable(&self, name: &str) -> Option<&SmgObject> {
        self.variables.get(name)
    }

    /// Returns true if the frame declares a variable with the given name.
    pub fn contains_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// An iterator over the local-variable objects of the frame.
    pub fn variables(&self) -> impl Iterator<Item = &SmgObject> {
        self.variables.values()
    }

    /// The return-value object of the frame, absent for `void` functions.
    pub fn return_object(&self) -> Option<&SmgObject> {
        self.return_object.as_ref()
    }

    /// An iterator over every object owned by the frame,
    /// i.e. all local variables plus the return-value object if present.
    pub fn all_objects(&self) -> impl Iterator<Item = &SmgObject> {
        self.variables.values().chain(self.return_object.iter())
    }
}
