//! Predicate search over a markup tree.
//!
//! All searches are depth-first and pre-order, include the starting element
//! itself, and only ever match element nodes. An empty result is not an
//! error; callers decide whether a missing node is fatal.

use super::{Element, MarkupNode};

/// Find every element under (and including) `root` for which `predicate` holds.
///
/// Results are in document pre-order and each element appears at most once.
/// The predicate sees the element's own tag and attributes; matching does not
/// depend on descendants.
pub fn find_all<'a, P>(root: &'a Element, predicate: P) -> Vec<&'a Element>
where
    P: Fn(&Element) -> bool,
{
    let mut found = Vec::new();
    collect(root, &predicate, &mut found);
    found
}

/// Run [`find_all`] from each element of `scope`, merging results in order.
///
/// Used to narrow a previous result set. An element reachable from more than
/// one scope entry (nested scope entries) is reported once.
pub fn find_all_in<'a, P>(scope: &[&'a Element], predicate: P) -> Vec<&'a Element>
where
    P: Fn(&Element) -> bool,
{
    let mut found: Vec<&'a Element> = Vec::new();
    for &root in scope {
        let mut batch = Vec::new();
        collect(root, &predicate, &mut batch);
        for element in batch {
            if !found.iter().any(|seen| std::ptr::eq(*seen, element)) {
                found.push(element);
            }
        }
    }
    found
}

fn collect<'a, P>(root: &'a Element, predicate: &P, found: &mut Vec<&'a Element>)
where
    P: Fn(&Element) -> bool,
{
    let mut stack = vec![root];
    while let Some(element) = stack.pop() {
        if predicate(element) {
            found.push(element);
        }
        // Reverse so the leftmost child is popped first.
        for child in element.children.iter().rev() {
            if let MarkupNode::Element(child) = child {
                stack.push(child);
            }
        }
    }
}

/// Elements with the given tag name.
#[must_use]
pub fn find_by_tag<'a>(root: &'a Element, tag: &str) -> Vec<&'a Element> {
    find_all(root, |e| e.tag == tag)
}

/// Elements carrying the attribute `name`, whatever its value.
#[must_use]
pub fn find_with_attr<'a>(root: &'a Element, name: &str) -> Vec<&'a Element> {
    find_all(root, |e| e.attributes.contains_key(name))
}

/// Elements whose attribute `name` equals `value` exactly.
#[must_use]
pub fn find_by_attr<'a>(root: &'a Element, name: &str, value: &str) -> Vec<&'a Element> {
    find_all(root, |e| e.attr(name) == Some(value))
}

/// Elements whose `class` attribute lists `class`.
#[must_use]
pub fn find_by_class<'a>(root: &'a Element, class: &str) -> Vec<&'a Element> {
    find_all(root, |e| e.has_class(class))
}

/// Elements whose `id` attribute equals `id`.
#[must_use]
pub fn find_by_id<'a>(root: &'a Element, id: &str) -> Vec<&'a Element> {
    find_by_attr(root, "id", id)
}

/// Concatenate every text leaf below `element` in document order.
#[must_use]
pub fn text_content(element: &Element) -> String {
    let mut text = String::new();
    let mut stack: Vec<&MarkupNode> = element.children.iter().rev().collect();
    while let Some(node) = stack.pop() {
        match node {
            MarkupNode::Text(t) => text.push_str(t),
            MarkupNode::Element(child) => stack.extend(child.children.iter().rev()),
        }
    }
    text
}
