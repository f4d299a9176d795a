//! Bidirectional tag index.
//!
//! Not synchronized on its own; the owning store guards it with one lock so that
//! "union keys into tag sets" and "pop all keys for a tag set" are each atomic.

use std::collections::{HashMap, HashSet};

use crate::tags::TagSet;

#[derive(Debug, Default)]
pub struct TagIndex {
    tag_to_keys: HashMap<String, HashSet<String>>,
    key_to_tags: HashMap<String, TagSet>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `key` under `tags`, replacing any previous registration of `key`.
    pub fn insert(&mut self, key: &str, tags: &TagSet) {
        self.remove_key(key);
        for tag in tags {
            self.tag_to_keys
                .entry(tag.clone())
                .or_default()
                .insert(key.to_string());
        }
        self.key_to_tags.insert(key.to_string(), tags.clone());
    }

    /// Drops `key` from every tag set it belongs to.
    pub fn remove_key(&mut self, key: &str) -> bool {
        let Some(tags) = self.key_to_tags.remove(key) else {
            return false;
        };
        for tag in &tags {
            if let Some(keys) = self.tag_to_keys.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.tag_to_keys.remove(tag);
                }
            }
        }
        true
    }

    /// Removes and returns every key tagged with any of `tags`, unregistering those
    /// keys from all of their other tags as well.
    pub fn take_keys(&mut self, tags: &TagSet) -> HashSet<String> {
        let mut keys = HashSet::new();
        for tag in tags {
            if let Some(tagged) = self.tag_to_keys.remove(tag) {
                keys.extend(tagged);
            }
        }
        for key in &keys {
            self.remove_key(key);
        }
        keys
    }

    pub fn keys_for_tag(&self, tag: &str) -> HashSet<String> {
        self.tag_to_keys.get(tag).cloned().unwrap_or_default()
    }

    pub fn tags_for_key(&self, key: &str) -> Option<&TagSet> {
        self.key_to_tags.get(key)
    }

    pub fn key_count(&self) -> usize {
        self.key_to_tags.len()
    }

    pub fn tag_count(&self) -> usize {
        self.tag_to_keys.len()
    }

    pub fn clear(&mut self) {
        self.tag_to_keys.clear();
        self.key_to_tags.clear();
    }
}
