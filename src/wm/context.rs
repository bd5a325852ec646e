//! Context Module
//!
//! A named group of workspaces. Each context has its own active and
//! previously active workspace and its own set of sticky clients.

use crate::wm::cycle::Cycle;
use crate::wm::geometry::{Index, Window};
use crate::wm::workspace::Workspace;

#[derive(Debug, Clone)]
pub struct Context {
    name: String,
    workspaces: Cycle<Workspace>,
    partition: Option<Index>,
    sticky_clients: Vec<Window>,
}

impl Context {
    pub fn new(name: impl Into<String>, workspace_names: &[String]) -> Self {
        let workspaces = workspace_names
            .iter()
            .enumerate()
            .map(|(i, name)| Workspace::new(i, name.as_str()))
            .collect();

        Self {
            name: name.into(),
            workspaces: Cycle::new(workspaces),
            partition: None,
            sticky_clients: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn partition(&self) -> Option<Index> {
        self.partition
    }

    pub fn set_partition(&mut self, partition: Option<Index>) {
        self.partition = partition;
    }

    pub fn workspaces(&self) -> &Cycle<Workspace> {
        &self.workspaces
    }

    pub fn workspace_count(&self) -> usize {
        self.workspaces.len()
    }

    pub fn workspace(&self, index: Index) -> Option<&Workspace> {
        self.workspaces.get(index)
    }

    pub fn workspace_mut(&mut self, index: Index) -> Option<&mut Workspace> {
        self.workspaces.get_mut(index)
    }

    pub fn active_workspace(&self) -> Index {
        self.workspaces.active_index().unwrap_or(0)
    }

    pub fn prev_workspace(&self) -> Option<Index> {
        self.workspaces.previous_index()
    }

    pub fn activate_workspace(&mut self, index: Index) -> bool {
        if index == self.active_workspace() {
            return false;
        }

        self.workspaces.activate_at_index(index).is_some()
    }

    pub fn sticky_clients(&self) -> &[Window] {
        &self.sticky_clients
    }

    pub fn add_sticky(&mut self, window: Window) {
        if !self.sticky_clients.contains(&window) {
            self.sticky_clients.push(window);
        }
    }

    pub fn remove_sticky(&mut self, window: Window) {
        self.sticky_clients.retain(|&sticky| sticky != window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (1..=n).map(|i| i.to_string()).collect()
    }

    #[test]
    fn test_workspace_activation() {
        let mut context = Context::new("a", &names(3));
        assert_eq!(context.active_workspace(), 0);
        assert!(!context.activate_workspace(0));
        assert!(context.activate_workspace(2));
        assert_eq!(context.prev_workspace(), Some(0));
        assert!(!context.activate_workspace(5));
        assert_eq!(context.active_workspace(), 2);
        assert_eq!(context.name(), "a");
        assert_eq!(context.workspace(2).map(Workspace::name), Some("3"));
    }

    #[test]
    fn test_sticky_set() {
        let mut context = Context::new("a", &names(1));
        context.add_sticky(4);
        context.add_sticky(4);
        assert_eq!(context.sticky_clients(), &[4]);
        context.remove_sticky(4);
        assert!(context.sticky_clients().is_empty());
    }
}
