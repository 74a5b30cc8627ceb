//! Dotted-path evaluation against a member's structural tree.

use crate::resolve::tree::Node;

///
/// PathError
///
/// Raised by `locate`; the resolver maps these onto the error vocabulary
/// with the full location trail attached.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PathError {
    /// A segment named nothing at its level.
    DoesNotExist(String),
    /// A segment named a member of a referenced type outside its primary key.
    BeyondReferenceKey(String),
}

/// Resolve a non-empty dotted path against a tree, left to right.
///
/// Reference nodes match the whole remaining path against their
/// primary-key field names (which may themselves be dotted); anything else
/// under a reference is either a known non-key member or nonexistent.
pub fn locate<'t>(root: &'t mut Node, path: &str) -> Result<&'t mut Node, PathError> {
    locate_inner(root, path, path)
}

fn locate_inner<'t>(node: &'t mut Node, remaining: &str, full: &str) -> Result<&'t mut Node, PathError> {
    if remaining.is_empty() {
        return Err(PathError::DoesNotExist(full.to_string()));
    }

    match node {
        Node::Leaf(_) => Err(PathError::DoesNotExist(full.to_string())),

        Node::Aggregate(agg) => {
            let (head, rest) = split_segment(remaining);
            let child = agg
                .children
                .iter_mut()
                .find(|c| c.ident() == head)
                .ok_or_else(|| PathError::DoesNotExist(full.to_string()))?;

            if rest.is_empty() {
                Ok(child)
            } else {
                locate_inner(child, rest, full)
            }
        }

        Node::Reference(reference) => {
            let is_member = {
                let (head, _) = split_segment(remaining);
                reference.target.member_idents.iter().any(|m| m == head)
            };

            match reference
                .children
                .iter()
                .position(|c| c.ident() == remaining)
            {
                Some(index) => Ok(&mut reference.children[index]),
                None if is_member => Err(PathError::BeyondReferenceKey(full.to_string())),
                None => Err(PathError::DoesNotExist(full.to_string())),
            }
        }
    }
}

/// Collect the dotted source paths of every leaf under a node, rooted at
/// `prefix`, in tree order.
pub fn leaf_paths(node: &Node, prefix: &str, out: &mut Vec<String>) {
    let path = if prefix.is_empty() {
        node.ident().to_string()
    } else {
        format!("{prefix}.{}", node.ident())
    };

    match node {
        Node::Leaf(_) => out.push(path),
        Node::Aggregate(agg) => {
            for child in &agg.children {
                leaf_paths(child, &path, out);
            }
        }
        Node::Reference(reference) => {
            for child in &reference.children {
                leaf_paths(child, &path, out);
            }
        }
    }
}

/// Apply a closure to every leaf under a node.
pub fn for_each_leaf(node: &mut Node, f: &mut impl FnMut(&mut crate::resolve::tree::LeafNode)) {
    match node {
        Node::Leaf(leaf) => f(leaf),
        Node::Aggregate(agg) => {
            for child in &mut agg.children {
                for_each_leaf(child, f);
            }
        }
        Node::Reference(reference) => {
            for child in &mut reference.children {
                for_each_leaf(child, f);
            }
        }
    }
}

fn split_segment(path: &str) -> (&str, &str) {
    match path.split_once('.') {
        Some((head, rest)) => (head, rest),
        None => (path, ""),
    }
}
