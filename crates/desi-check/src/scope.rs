//! Scope chain for body checking.
//!
//! Variables live in a single arena owned by the checker so that read/write
//! flags survive scope exit (the unused-binding pass runs after the whole
//! function is checked). Frames map names to arena indices; lookups walk
//! outward and mutations land on the defining entry, never a copy.

use std::collections::HashMap;

use crate::kind::Kind;

#[derive(Debug, Clone)]
pub struct VarInfo {
    pub kind: Kind,
    pub mutable: bool,
    pub decl_name: String,
    pub read: bool,
    pub written: bool,
}

#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<HashMap<String, usize>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack {
            frames: vec![HashMap::new()],
        }
    }

    pub fn push_frame(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    /// Bind a name in the innermost frame. Returns false when the name is
    /// already declared in that frame.
    pub fn define(&mut self, name: &str, index: usize) -> bool {
        let Some(frame) = self.frames.last_mut() else {
            return false;
        };
        if frame.contains_key(name) {
            return false;
        }
        frame.insert(name.to_string(), index);
        true
    }

    /// Resolve a name, walking from the innermost frame outward.
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name).copied())
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_frames_shadow_and_unwind() {
        let mut s = ScopeStack::new();
        assert!(s.define("x", 0));
        s.push_frame();
        assert!(s.define("x", 1));
        assert_eq!(s.lookup("x"), Some(1));
        s.pop_frame();
        assert_eq!(s.lookup("x"), Some(0));
    }

    #[test]
    fn redefinition_in_same_frame_is_rejected() {
        let mut s = ScopeStack::new();
        assert!(s.define("x", 0));
        assert!(!s.define("x", 1));
    }
}
