// src/utils/category_tree.rs

use std::collections::{HashMap, HashSet};

use crate::error::AppError;

/// Parent-pointer snapshot of the category table.
pub struct CategoryTree {
    children: HashMap<i64, Vec<i64>>,
    ids: HashSet<i64>,
}

impl CategoryTree {
    /// Builds the tree from `(id, parent_id)` rows.
    pub fn from_links<I>(links: I) -> Self
    where
        I: IntoIterator<Item = (i64, Option<i64>)>,
    {
        let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
        let mut ids = HashSet::new();

        for (id, parent_id) in links {
            ids.insert(id);
            if let Some(parent_id) = parent_id {
                children.entry(parent_id).or_default().push(id);
            }
        }

        Self { children, ids }
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    /// Direct children of `id`, in insertion order.
    pub fn children_of(&self, id: i64) -> &[i64] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    /// The category itself plus every descendant reachable through child links.
    ///
    /// Each node is visited once, so a cyclic snapshot still terminates.
    pub fn resolve_subtree(&self, root: i64) -> Result<HashSet<i64>, AppError> {
        if !self.contains(root) {
            return Err(AppError::NotFound("Category not found".to_string()));
        }

        let mut result = HashSet::from([root]);
        let mut stack = vec![root];

        while let Some(current) = stack.pop() {
            for &child in self.children_of(current) {
                if result.insert(child) {
                    stack.push(child);
                }
            }
        }

        Ok(result)
    }

    /// Whether re-parenting `id` under `new_parent` would close a loop.
    pub fn would_create_cycle(&self, id: i64, new_parent: i64) -> bool {
        if id == new_parent {
            return true;
        }
        self.resolve_subtree(id)
            .map(|subtree| subtree.contains(&new_parent))
            .unwrap_or(false)
    }
}
