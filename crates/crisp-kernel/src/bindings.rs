//! Scoped, multi-space binding storage.
//!
//! Bindings provide name lookup with:
//! - Nested scope frames (enter/exit for blocks)
//! - Separate namespaces per [`BindingSpace`], so `$vault` the variable
//!   and `vault` the app address never collide
//! - A tri-state lookup result distinguishing "never bound" from "bound
//!   to nothing" ([`Memo`])
//!
//! Frames live in an index arena. Exiting a scope only moves the current
//! pointer back to the parent; frames are dropped with the manager at the
//! end of an interpretation or eager pass.

use std::collections::BTreeMap;
use std::fmt;

use crisp_types::Value;

/// Namespace partition for bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BindingSpace {
    /// Script variables, `$name`.
    User,
    /// App and account addresses, keyed by identifier.
    Address,
    /// Contract interfaces.
    Abi,
    /// Loaded modules, keyed by module name.
    Module,
    /// External data connectors.
    DataProvider,
    /// Module aliases, keyed by alias; the value is the module name.
    Alias,
    Other,
}

impl fmt::Display for BindingSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BindingSpace::User => "user",
            BindingSpace::Address => "address",
            BindingSpace::Abi => "abi",
            BindingSpace::Module => "module",
            BindingSpace::DataProvider => "data provider",
            BindingSpace::Alias => "alias",
            BindingSpace::Other => "other",
        };
        f.write_str(name)
    }
}

/// A named value in one space.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub identifier: String,
    /// `None` records a name that is known to have no value.
    pub value: Option<Value>,
    pub space: BindingSpace,
    /// Identifier of the binding this one was derived from.
    pub parent: Option<String>,
}

impl Binding {
    pub fn new(identifier: impl Into<String>, value: Option<Value>, space: BindingSpace) -> Self {
        Self {
            identifier: identifier.into(),
            value,
            space,
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

/// Result of looking up a binding's value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Memo<'a> {
    /// No binding with this name exists in scope.
    Unset,
    /// A binding exists and records that there is no value.
    Absent,
    Present(&'a Value),
}

impl<'a> Memo<'a> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Memo::Unset)
    }

    pub fn value(&self) -> Option<&'a Value> {
        match self {
            Memo::Present(v) => Some(v),
            Memo::Unset | Memo::Absent => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    #[error("{space} binding '{identifier}' already exists in this scope")]
    Duplicate {
        identifier: String,
        space: BindingSpace,
    },
}

/// Selects which bindings [`BindingsManager::get_all_bindings`] returns.
#[derive(Debug, Clone, Default)]
pub struct BindingsFilter {
    /// Only the current frame, not its ancestors.
    pub only_local: bool,
    /// Restrict to these spaces; empty means all.
    pub spaces: Vec<BindingSpace>,
}

impl BindingsFilter {
    pub fn local() -> Self {
        Self {
            only_local: true,
            spaces: Vec::new(),
        }
    }

    pub fn space(mut self, space: BindingSpace) -> Self {
        self.spaces.push(space);
        self
    }

    fn accepts(&self, space: BindingSpace) -> bool {
        self.spaces.is_empty() || self.spaces.contains(&space)
    }
}

#[derive(Debug, Clone, Default)]
struct Frame {
    parent: Option<usize>,
    bindings: BTreeMap<(BindingSpace, String), Binding>,
}

/// Scoped bindings for one interpretation or eager pass.
#[derive(Debug, Clone)]
pub struct BindingsManager {
    frames: Vec<Frame>,
    current: usize,
}

impl Default for BindingsManager {
    fn default() -> Self {
        Self::new()
    }
}

impl BindingsManager {
    /// Create a manager holding one empty root frame.
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
            current: 0,
        }
    }

    /// Open a child frame of the current one and make it current.
    pub fn enter_scope(&mut self) {
        self.frames.push(Frame {
            parent: Some(self.current),
            bindings: BTreeMap::new(),
        });
        self.current = self.frames.len() - 1;
    }

    /// Return to the parent of the current frame.
    ///
    /// Panics if the current frame is the root.
    pub fn exit_scope(&mut self) {
        match self.frames[self.current].parent {
            Some(parent) => self.current = parent,
            None => panic!("cannot exit the root binding scope"),
        }
    }

    /// Nesting depth of the current frame; the root is 0.
    pub fn depth(&self) -> usize {
        self.chain().count() - 1
    }

    /// Bind `identifier` in the current frame, or the root when `is_global`.
    pub fn set_binding(
        &mut self,
        identifier: impl Into<String>,
        value: Option<Value>,
        space: BindingSpace,
        is_global: bool,
    ) -> Result<(), BindingError> {
        self.insert(Binding::new(identifier, value, space), is_global)
    }

    /// Like [`set_binding`](Self::set_binding), recording where the value
    /// came from.
    pub fn set_binding_with_parent(
        &mut self,
        identifier: impl Into<String>,
        value: Option<Value>,
        space: BindingSpace,
        parent: impl Into<String>,
        is_global: bool,
    ) -> Result<(), BindingError> {
        self.insert(
            Binding::new(identifier, value, space).with_parent(parent),
            is_global,
        )
    }

    fn insert(&mut self, binding: Binding, is_global: bool) -> Result<(), BindingError> {
        let frame = if is_global { 0 } else { self.current };
        let key = (binding.space, binding.identifier.clone());
        let bindings = &mut self.frames[frame].bindings;
        if bindings.contains_key(&key) {
            return Err(BindingError::Duplicate {
                identifier: binding.identifier,
                space: binding.space,
            });
        }
        bindings.insert(key, binding);
        Ok(())
    }

    /// Nearest binding for `identifier` in `space`.
    pub fn get_binding(&self, identifier: &str, space: BindingSpace) -> Option<&Binding> {
        let key = (space, identifier.to_string());
        self.chain()
            .find_map(|frame| self.frames[frame].bindings.get(&key))
    }

    pub fn get_binding_value(&self, identifier: &str, space: BindingSpace) -> Memo<'_> {
        match self.get_binding(identifier, space) {
            None => Memo::Unset,
            Some(Binding { value: None, .. }) => Memo::Absent,
            Some(Binding {
                value: Some(value), ..
            }) => Memo::Present(value),
        }
    }

    pub fn has_binding(&self, identifier: &str, space: BindingSpace) -> bool {
        self.get_binding(identifier, space).is_some()
    }

    /// Visible bindings, nearest occurrence of each (space, identifier)
    /// only, ordered by space then identifier.
    pub fn get_all_bindings(&self, filter: &BindingsFilter) -> Vec<Binding> {
        let mut seen: BTreeMap<(BindingSpace, &str), &Binding> = BTreeMap::new();
        let frames: Vec<usize> = if filter.only_local {
            vec![self.current]
        } else {
            self.chain().collect()
        };
        for frame in frames {
            for ((space, identifier), binding) in &self.frames[frame].bindings {
                if filter.accepts(*space) {
                    seen.entry((*space, identifier.as_str())).or_insert(binding);
                }
            }
        }
        seen.into_values().cloned().collect()
    }

    /// Copy in every binding visible in `other` that is not already
    /// visible here. Existing bindings are never overwritten.
    pub fn merge_bindings(&mut self, other: &BindingsManager) {
        self.merge(other.get_all_bindings(&BindingsFilter::default()));
    }

    /// Add raw bindings to the current frame, skipping any whose
    /// (identifier, space) is already visible.
    pub fn merge(&mut self, bindings: impl IntoIterator<Item = Binding>) {
        for binding in bindings {
            if !self.has_binding(&binding.identifier, binding.space) {
                let key = (binding.space, binding.identifier.clone());
                self.frames[self.current].bindings.insert(key, binding);
            }
        }
    }

    /// Frame indices from the current frame up to the root.
    fn chain(&self) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(Some(self.current), |&i| self.frames[i].parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: i64) -> Value {
        Value::from(n)
    }

    #[test]
    fn new_manager_is_at_root() {
        let bindings = BindingsManager::new();
        assert_eq!(bindings.depth(), 0);
    }

    #[test]
    fn set_and_get_binding() {
        let mut b = BindingsManager::new();
        b.set_binding("$x", Some(num(5)), BindingSpace::User, false)
            .unwrap();
        assert_eq!(
            b.get_binding_value("$x", BindingSpace::User),
            Memo::Present(&num(5))
        );
    }

    #[test]
    fn spaces_are_separate() {
        let mut b = BindingsManager::new();
        b.set_binding("vault", Some(num(1)), BindingSpace::Address, false)
            .unwrap();
        assert!(!b.has_binding("vault", BindingSpace::User));
        b.set_binding("vault", Some(num(2)), BindingSpace::User, false)
            .unwrap();
    }

    #[test]
    fn inner_frame_shadows_outer() {
        let mut b = BindingsManager::new();
        b.set_binding("$x", Some(num(1)), BindingSpace::User, false)
            .unwrap();
        b.enter_scope();
        b.set_binding("$x", Some(num(2)), BindingSpace::User, false)
            .unwrap();
        assert_eq!(b.get_binding_value("$x", BindingSpace::User).value(), Some(&num(2)));
        b.exit_scope();
        assert_eq!(b.get_binding_value("$x", BindingSpace::User).value(), Some(&num(1)));
    }

    #[test]
    fn exited_scope_bindings_are_invisible() {
        let mut b = BindingsManager::new();
        b.enter_scope();
        b.set_binding("$inner", Some(num(1)), BindingSpace::User, false)
            .unwrap();
        b.exit_scope();
        assert!(b.get_binding_value("$inner", BindingSpace::User).is_unset());
    }

    #[test]
    fn global_binding_lands_in_root() {
        let mut b = BindingsManager::new();
        b.enter_scope();
        b.enter_scope();
        b.set_binding("app", None, BindingSpace::Address, true)
            .unwrap();
        b.exit_scope();
        b.exit_scope();
        assert!(b.has_binding("app", BindingSpace::Address));
    }

    #[test]
    fn duplicate_in_same_frame_is_an_error() {
        let mut b = BindingsManager::new();
        b.set_binding("$x", Some(num(1)), BindingSpace::User, false)
            .unwrap();
        let err = b
            .set_binding("$x", Some(num(2)), BindingSpace::User, false)
            .unwrap_err();
        assert_eq!(
            err,
            BindingError::Duplicate {
                identifier: "$x".into(),
                space: BindingSpace::User
            }
        );
        assert_eq!(err.to_string(), "user binding '$x' already exists in this scope");
    }

    #[test]
    fn null_is_distinct_from_unset() {
        let mut b = BindingsManager::new();
        b.set_binding("$maybe", None, BindingSpace::User, false)
            .unwrap();
        assert_eq!(b.get_binding_value("$maybe", BindingSpace::User), Memo::Absent);
        assert_eq!(b.get_binding_value("$other", BindingSpace::User), Memo::Unset);
        assert!(b.has_binding("$maybe", BindingSpace::User));
    }

    #[test]
    fn get_all_returns_nearest_occurrence_sorted() {
        let mut b = BindingsManager::new();
        b.set_binding("$b", Some(num(1)), BindingSpace::User, false)
            .unwrap();
        b.set_binding("$a", Some(num(1)), BindingSpace::User, false)
            .unwrap();
        b.set_binding("vault", None, BindingSpace::Address, false)
            .unwrap();
        b.enter_scope();
        b.set_binding("$b", Some(num(2)), BindingSpace::User, false)
            .unwrap();

        let all = b.get_all_bindings(&BindingsFilter::default());
        let names: Vec<_> = all.iter().map(|b| b.identifier.as_str()).collect();
        assert_eq!(names, vec!["$a", "$b", "vault"]);
        assert_eq!(all[1].value, Some(num(2)));

        let users = b.get_all_bindings(&BindingsFilter::default().space(BindingSpace::User));
        assert_eq!(users.len(), 2);

        let local = b.get_all_bindings(&BindingsFilter::local());
        assert_eq!(local.len(), 1);
        assert_eq!(local[0].identifier, "$b");
    }

    #[test]
    fn merge_never_overwrites() {
        let mut target = BindingsManager::new();
        target
            .set_binding("$x", Some(num(1)), BindingSpace::User, false)
            .unwrap();

        let mut source = BindingsManager::new();
        source
            .set_binding("$x", Some(num(99)), BindingSpace::User, false)
            .unwrap();
        source
            .set_binding("$y", Some(num(2)), BindingSpace::User, false)
            .unwrap();

        target.merge_bindings(&source);
        assert_eq!(target.get_binding_value("$x", BindingSpace::User).value(), Some(&num(1)));
        assert_eq!(target.get_binding_value("$y", BindingSpace::User).value(), Some(&num(2)));
    }

    #[test]
    fn parent_link_is_recorded() {
        let mut b = BindingsManager::new();
        b.set_binding_with_parent("vault:0", None, BindingSpace::Address, "vault", false)
            .unwrap();
        let binding = b.get_binding("vault:0", BindingSpace::Address).unwrap();
        assert_eq!(binding.parent.as_deref(), Some("vault"));
    }

    #[test]
    #[should_panic(expected = "cannot exit the root binding scope")]
    fn exiting_root_panics() {
        let mut b = BindingsManager::new();
        b.exit_scope();
    }
}
