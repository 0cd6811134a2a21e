//! Shared command registry keyed by lowercased command name.

use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use tracing::debug;

use crate::command::Command;

/// Shared command registry.
///
/// Clones share one table. Registering a name that already exists replaces the earlier command.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    commands: Rc<RefCell<BTreeMap<String, Rc<Command>>>>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one command and returns the command it displaced, if any.
    pub fn register(&self, command: Command) -> Option<Rc<Command>> {
        let name = command.name().to_string();
        let displaced = self
            .commands
            .borrow_mut()
            .insert(name.clone(), Rc::new(command));
        if displaced.is_some() {
            debug!(command = %name, "replaced registered command");
        }
        displaced
    }

    /// Removes a command by name.
    pub fn unregister(&self, name: &str) -> Option<Rc<Command>> {
        self.commands.borrow_mut().remove(&name.to_lowercase())
    }

    /// Looks up a command by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<Rc<Command>> {
        self.commands.borrow().get(&name.to_lowercase()).cloned()
    }

    /// Returns whether a command is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.commands.borrow().contains_key(&name.to_lowercase())
    }

    /// Returns every registered command sorted by name.
    pub fn commands(&self) -> Vec<Rc<Command>> {
        self.commands.borrow().values().cloned().collect()
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.borrow().len()
    }

    /// Returns whether no command is registered.
    pub fn is_empty(&self) -> bool {
        self.commands.borrow().is_empty()
    }
}
