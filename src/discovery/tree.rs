//! Channel ordering and hierarchy building

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::types::{Channel, ChannelNode, Snowflake};

/// Drop repeated identifiers, keeping the first occurrence
pub fn dedup_channels(channels: Vec<Channel>) -> Vec<Channel> {
    let mut seen = HashSet::with_capacity(channels.len());
    channels
        .into_iter()
        .filter(|c| seen.insert(c.id))
        .collect()
}

/// Sort channels into display order
///
/// Direct conversations come first, most recently active first (conversations
/// without activity last). Everything else follows by ascending position, with
/// unpositioned channels after positioned ones. Ties break on identifier, so
/// the result is deterministic for a given input set.
pub fn order_channels(mut channels: Vec<Channel>) -> Vec<Channel> {
    channels.sort_by(compare_display_order);
    channels
}

fn compare_display_order(a: &Channel, b: &Channel) -> Ordering {
    match (a.kind.is_direct(), b.kind.is_direct()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        // Option orders None first, so reversing puts inactive conversations last
        (true, true) => b.last_message_id.cmp(&a.last_message_id),
        (false, false) => compare_position(a.position, b.position),
    }
    .then_with(|| a.id.cmp(&b.id))
}

fn compare_position(a: Option<i32>, b: Option<i32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Link ordered channels into a hierarchy
///
/// A channel nests under its parent when the parent is part of `ordered`;
/// otherwise (no parent, or a dangling reference) it is a root. Siblings keep
/// their relative order from `ordered`. Malformed parent cycles cannot drop
/// channels: anything unreachable from a root is promoted to one.
pub fn build_tree(ordered: &[Channel]) -> Vec<ChannelNode> {
    let present: HashSet<Snowflake> = ordered.iter().map(|c| c.id).collect();

    let mut children_of: HashMap<Snowflake, Vec<usize>> = HashMap::new();
    let mut roots = Vec::new();
    for (index, channel) in ordered.iter().enumerate() {
        match channel.parent_id() {
            Some(parent) if parent != channel.id && present.contains(&parent) => {
                children_of.entry(parent).or_default().push(index);
            }
            _ => roots.push(index),
        }
    }

    let mut placed = vec![false; ordered.len()];
    let mut nodes = Vec::with_capacity(roots.len());
    for index in roots {
        nodes.push(build_node(index, ordered, &children_of, &mut placed));
    }

    for index in 0..ordered.len() {
        if !placed[index] {
            nodes.push(build_node(index, ordered, &children_of, &mut placed));
        }
    }

    nodes
}

fn build_node(
    index: usize,
    ordered: &[Channel],
    children_of: &HashMap<Snowflake, Vec<usize>>,
    placed: &mut [bool],
) -> ChannelNode {
    placed[index] = true;
    let channel = &ordered[index];

    let mut children = Vec::new();
    if let Some(child_indices) = children_of.get(&channel.id) {
        for &child in child_indices {
            if !placed[child] {
                children.push(build_node(child, ordered, children_of, placed));
            }
        }
    }

    ChannelNode {
        channel: channel.clone(),
        children,
    }
}
