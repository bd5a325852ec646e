//! Cycle Module
//!
//! Ordered collection with one active element and a remembered previously
//! active element. Backs workspaces, contexts, partitions and every
//! per-workspace client list.
//!
//! Every operation on an invalid index or an empty cycle is a no-op, so a
//! late or duplicate event can never leave a cycle torn.

use crate::wm::geometry::{Direction, Index};

/// Where to insert a new element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPos {
    Back,
    AfterActive,
}

#[derive(Debug, Clone)]
pub struct Cycle<T> {
    elements: Vec<T>,
    active: Option<Index>,
    previous: Option<Index>,
}

impl<T> Default for Cycle<T> {
    fn default() -> Self {
        Self {
            elements: Vec::new(),
            active: None,
            previous: None,
        }
    }
}

impl<T> Cycle<T> {
    /// Build a cycle whose first element (if any) is active
    pub fn new(elements: Vec<T>) -> Self {
        let active = if elements.is_empty() { None } else { Some(0) };

        Self {
            elements,
            active,
            previous: None,
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.elements.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.elements.iter_mut()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.elements
    }

    pub fn get(&self, index: Index) -> Option<&T> {
        self.elements.get(index)
    }

    pub fn get_mut(&mut self, index: Index) -> Option<&mut T> {
        self.elements.get_mut(index)
    }

    pub fn active_index(&self) -> Option<Index> {
        self.active
    }

    pub fn previous_index(&self) -> Option<Index> {
        self.previous
    }

    pub fn active_element(&self) -> Option<&T> {
        self.active.and_then(|index| self.elements.get(index))
    }

    pub fn active_element_mut(&mut self) -> Option<&mut T> {
        self.active.and_then(|index| self.elements.get_mut(index))
    }

    pub fn insert_at_back(&mut self, element: T) {
        self.insert_at(InsertPos::Back, element);
    }

    /// Insert an element; an empty cycle activates it
    pub fn insert_at(&mut self, pos: InsertPos, element: T) {
        let index = match (pos, self.active) {
            (InsertPos::AfterActive, Some(active)) => active + 1,
            _ => self.elements.len(),
        };

        self.elements.insert(index, element);

        match self.active {
            None => self.active = Some(index),
            Some(active) if index <= active => self.active = Some(active + 1),
            _ => {}
        }

        if let Some(previous) = self.previous {
            if index <= previous {
                self.previous = Some(previous + 1);
            }
        }
    }

    /// Remove the element at `index`; a removed active element hands
    /// active-ness to the element now occupying its slot
    pub fn remove_at_index(&mut self, index: Index) -> Option<T> {
        if index >= self.elements.len() {
            return None;
        }

        let element = self.elements.remove(index);
        let len = self.elements.len();

        self.active = match self.active {
            _ if self.is_empty() => None,
            Some(active) if active == index => Some(index.min(len - 1)),
            Some(active) if active > index => Some(active - 1),
            active => active,
        };

        self.previous = match self.previous {
            Some(previous) if previous == index => None,
            Some(previous) if previous > index => Some(previous - 1),
            previous => previous,
        };

        if self.previous == self.active {
            self.previous = None;
        }

        Some(element)
    }

    /// Activate the element at `index`, remembering the prior active one
    pub fn activate_at_index(&mut self, index: Index) -> Option<&T> {
        if index >= self.elements.len() {
            return None;
        }

        if self.active != Some(index) {
            self.previous = self.active;
            self.active = Some(index);
        }

        self.elements.get(index)
    }

    /// Index of the neighbour of the active element in `dir`
    pub fn next_index(&self, dir: Direction, wrap: bool) -> Option<Index> {
        let active = self.active?;
        let last = self.elements.len().checked_sub(1)?;

        match dir {
            Direction::Forward if active < last => Some(active + 1),
            Direction::Forward if wrap => Some(0),
            Direction::Backward if active > 0 => Some(active - 1),
            Direction::Backward if wrap => Some(last),
            _ => None,
        }
    }

    /// Step the active pointer to its neighbour in `dir`
    pub fn cycle_active(&mut self, dir: Direction, wrap: bool) -> Option<&T> {
        let next = self.next_index(dir, wrap)?;
        self.activate_at_index(next)
    }

    /// Swap the active element with its neighbour, keeping it active
    pub fn drag_active(&mut self, dir: Direction, wrap: bool) -> Option<&T> {
        let active = self.active?;
        let next = self.next_index(dir, wrap)?;

        if active == next {
            return None;
        }

        self.elements.swap(active, next);
        self.active = Some(next);

        if self.previous == Some(next) {
            self.previous = Some(active);
        }

        self.elements.get(next)
    }

    pub fn reverse(&mut self) {
        let len = self.elements.len();
        self.elements.reverse();
        self.active = self.active.map(|index| len - 1 - index);
        self.previous = self.previous.map(|index| len - 1 - index);
    }

    /// Rotate the whole sequence by one step; the active slot stays put
    pub fn rotate(&mut self, dir: Direction) {
        let len = self.elements.len();
        self.rotate_range(dir, 0, len);
    }

    /// Rotate only the elements in `lo..hi`; the active slot stays put
    pub fn rotate_range(&mut self, dir: Direction, lo: Index, hi: Index) {
        let hi = hi.min(self.elements.len());

        if lo + 1 >= hi {
            return;
        }

        match dir {
            Direction::Forward => self.elements[lo..hi].rotate_right(1),
            Direction::Backward => self.elements[lo..hi].rotate_left(1),
        }
    }

    /// Elements in order with the active element last
    pub fn stack_after_active(&self) -> Vec<&T> {
        let mut stack: Vec<&T> = self
            .elements
            .iter()
            .enumerate()
            .filter(|&(index, _)| Some(index) != self.active)
            .map(|(_, element)| element)
            .collect();

        if let Some(active) = self.active_element() {
            stack.push(active);
        }

        stack
    }
}

impl<T: PartialEq> Cycle<T> {
    pub fn index_of(&self, element: &T) -> Option<Index> {
        self.elements.iter().position(|candidate| candidate == element)
    }

    pub fn contains(&self, element: &T) -> bool {
        self.elements.contains(element)
    }

    pub fn remove_element(&mut self, element: &T) -> Option<T> {
        let index = self.index_of(element)?;
        self.remove_at_index(index)
    }

    pub fn activate_element(&mut self, element: &T) -> Option<&T> {
        let index = self.index_of(element)?;
        self.activate_at_index(index)
    }

    /// Put `new` in the slot of `old`, preserving active-ness
    pub fn replace_element(&mut self, old: &T, new: T) -> bool {
        match self.index_of(old) {
            Some(index) => {
                self.elements[index] = new;
                true
            }
            None => false,
        }
    }
}

impl<T> std::ops::Index<Index> for Cycle<T> {
    type Output = T;

    fn index(&self, index: Index) -> &T {
        &self.elements[index]
    }
}

impl<T> std::ops::IndexMut<Index> for Cycle<T> {
    fn index_mut(&mut self, index: Index) -> &mut T {
        &mut self.elements[index]
    }
}
