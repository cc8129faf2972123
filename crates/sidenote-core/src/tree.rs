use crate::{AnnotationRecord, StoreSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode<'a> {
    pub record: &'a AnnotationRecord,
    pub children: Vec<&'a AnnotationRecord>,
}

/// Two-level view of a snapshot in insertion order.
///
/// Records whose parent is missing are shown as roots. Records nested under
/// a child (only possible in hand-edited data) are left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationTree<'a> {
    pub roots: Vec<TreeNode<'a>>,
}

impl<'a> AnnotationTree<'a> {
    pub fn build(snapshot: &'a StoreSnapshot) -> Self {
        let roots = snapshot
            .items
            .iter()
            .filter(|item| match item.parent_id {
                None => true,
                Some(parent_id) => snapshot.get(parent_id).is_none(),
            })
            .map(|record| TreeNode {
                record,
                children: snapshot.children(record.id).collect(),
            })
            .collect();
        Self { roots }
    }

    /// Case-insensitive content filter. A root that does not match hides its
    /// children with it, as the panel does.
    pub fn filter(&self, query: &str) -> Self {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.clone();
        }
        let matches = |record: &AnnotationRecord| record.content.to_lowercase().contains(&needle);
        let roots = self
            .roots
            .iter()
            .filter(|node| matches(node.record))
            .map(|node| TreeNode {
                record: node.record,
                children: node
                    .children
                    .iter()
                    .copied()
                    .filter(|child| matches(*child))
                    .collect(),
            })
            .collect();
        Self { roots }
    }

    pub fn len(&self) -> usize {
        self.roots
            .iter()
            .map(|node| 1 + node.children.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}
