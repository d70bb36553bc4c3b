//! Dependency analysis between categories
//!
//! Formula categories may reference each other, so the aggregation pipeline
//! evaluates them in dependency order. Parent links form the category
//! forest, which must stay acyclic for rollups to make sense.
//!
//! Used by both the aggregation pipeline and the validator.

use crate::formula;
use crate::model::{CategoryDefinition, DisplayType};
use crate::{TallyError, TallyResult};
use std::collections::{HashMap, HashSet, VecDeque};

/// Dependency graph over formula categories.
///
/// Maps a formula category id to the ids of the formula categories its
/// formula references, by case-insensitive name or by id. References to
/// plain categories and objects carry no ordering constraint.
///
/// # Examples
/// ```text
/// Categories: base = "{a} + {b}", final = "{base} * 2"
/// Returns: base -> {}, final -> {base}
/// ```
pub fn formula_dependencies(categories: &[&CategoryDefinition]) -> HashMap<String, HashSet<String>> {
    let formula_categories: Vec<&CategoryDefinition> = categories
        .iter()
        .copied()
        .filter(|c| c.display_type == DisplayType::Formula)
        .collect();

    let mut graph = HashMap::new();
    for category in &formula_categories {
        let mut dependencies = HashSet::new();
        if let Some(text) = category.formula.as_deref() {
            for reference in formula::extract_references(text) {
                let target = formula_categories
                    .iter()
                    .find(|c| c.name.eq_ignore_ascii_case(&reference))
                    .or_else(|| formula_categories.iter().find(|c| c.id == reference));
                if let Some(target) = target {
                    if target.id != category.id {
                        dependencies.insert(target.id.clone());
                    }
                }
            }
        }
        graph.insert(category.id.clone(), dependencies);
    }
    graph
}

/// Formula categories in the order they must be evaluated.
///
/// Independent categories keep their definition order.
pub fn formula_evaluation_order<'c>(
    categories: &[&'c CategoryDefinition],
) -> TallyResult<Vec<&'c CategoryDefinition>> {
    let formula_categories: Vec<&CategoryDefinition> = categories
        .iter()
        .copied()
        .filter(|c| c.display_type == DisplayType::Formula)
        .collect();
    let nodes: Vec<String> = formula_categories.iter().map(|c| c.id.clone()).collect();
    let graph = formula_dependencies(categories);

    let order = topological_sort(&nodes, &graph)?;
    Ok(order
        .iter()
        .filter_map(|id| formula_categories.iter().copied().find(|c| &c.id == id))
        .collect())
}

/// Kahn's algorithm over `graph` (node → its dependencies).
///
/// Ready nodes are taken in the order they appear in `nodes`, so the result
/// is deterministic.
pub(crate) fn topological_sort(
    nodes: &[String],
    graph: &HashMap<String, HashSet<String>>,
) -> TallyResult<Vec<String>> {
    // node -> nodes that depend on it
    let mut reverse_graph: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut dependency_count: HashMap<&str, usize> = HashMap::new();

    for node in nodes {
        let dependencies = graph.get(node);
        dependency_count.insert(node.as_str(), dependencies.map_or(0, |deps| deps.len()));
    }
    for node in nodes {
        for candidate in nodes {
            if graph.get(candidate).is_some_and(|deps| deps.contains(node)) {
                reverse_graph
                    .entry(node.as_str())
                    .or_default()
                    .push(candidate.as_str());
            }
        }
    }

    let mut queue: VecDeque<&str> = nodes
        .iter()
        .map(String::as_str)
        .filter(|node| dependency_count.get(node) == Some(&0))
        .collect();

    let mut result = Vec::with_capacity(nodes.len());
    while let Some(node) = queue.pop_front() {
        result.push(node.to_string());
        if let Some(dependents) = reverse_graph.get(node) {
            for dependent in dependents {
                if let Some(count) = dependency_count.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        queue.push_back(*dependent);
                    }
                }
            }
        }
    }

    if result.len() != nodes.len() {
        let mut stuck: Vec<&str> = nodes
            .iter()
            .map(String::as_str)
            .filter(|node| !result.iter().any(|done| done.as_str() == *node))
            .collect();
        stuck.sort_unstable();
        return Err(TallyError::CircularDependency(format!(
            "formula categories reference each other: {}",
            stuck.join(", ")
        )));
    }

    Ok(result)
}

/// First cycle found in the parent links, as a list of category ids
/// starting and ending with the same id
pub fn find_parent_cycle(categories: &[&CategoryDefinition]) -> Option<Vec<String>> {
    let parents: HashMap<&str, &str> = categories
        .iter()
        .filter_map(|c| Some((c.id.as_str(), c.parent_category_id.as_deref()?)))
        .collect();

    for category in categories {
        let mut path: Vec<&str> = vec![category.id.as_str()];
        let mut current = category.id.as_str();
        while let Some(&parent) = parents.get(current) {
            if let Some(start) = path.iter().position(|id| *id == parent) {
                let mut cycle: Vec<String> = path[start..].iter().map(|id| id.to_string()).collect();
                cycle.push(parent.to_string());
                return Some(cycle);
            }
            path.push(parent);
            current = parent;
        }
    }
    None
}

/// Length of the longest parent chain, ignoring cycles
pub fn category_depth(categories: &[&CategoryDefinition]) -> usize {
    let parents: HashMap<&str, &str> = categories
        .iter()
        .filter_map(|c| Some((c.id.as_str(), c.parent_category_id.as_deref()?)))
        .collect();

    categories
        .iter()
        .map(|category| {
            let mut seen = HashSet::new();
            let mut current = category.id.as_str();
            while seen.insert(current) {
                match parents.get(current) {
                    Some(&parent) => current = parent,
                    None => break,
                }
            }
            seen.len()
        })
        .max()
        .unwrap_or(0)
}
