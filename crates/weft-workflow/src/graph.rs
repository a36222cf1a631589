use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use serde::Serialize;
use weft_config::{Edge, Node};

/// A downstream connection recorded on the source node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependent {
  pub target_id: String,
  pub source_handle: String,
  pub target_handle: String,
}

/// Graph structure for scheduling and scope analysis.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
  /// Node ids in declaration order, first occurrence wins.
  node_ids: Vec<String>,
  /// Adjacency list: node_id -> downstream connections, one per edge.
  adjacency: HashMap<String, Vec<Dependent>>,
  /// Number of incoming edges per node.
  in_degree: HashMap<String, usize>,
  /// Direct upstream node ids, deduplicated, in edge order.
  ancestors: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
  /// Build a graph from nodes and edges.
  ///
  /// Edges whose source or target is not in `nodes` are skipped.
  pub fn build(nodes: &[Node], edges: &[Edge]) -> Self {
    let mut node_ids = Vec::with_capacity(nodes.len());
    let mut adjacency: HashMap<String, Vec<Dependent>> = HashMap::new();
    let mut in_degree: HashMap<String, usize> = HashMap::new();
    let mut ancestors: HashMap<String, Vec<String>> = HashMap::new();

    // Initialize all nodes
    for node in nodes {
      if in_degree.contains_key(&node.id) {
        continue;
      }
      node_ids.push(node.id.clone());
      adjacency.insert(node.id.clone(), Vec::new());
      in_degree.insert(node.id.clone(), 0);
      ancestors.insert(node.id.clone(), Vec::new());
    }

    for edge in edges {
      if !in_degree.contains_key(&edge.source) || !in_degree.contains_key(&edge.target) {
        tracing::trace!(
          edge_id = %edge.id,
          source = %edge.source,
          target = %edge.target,
          "skipping dangling edge"
        );
        continue;
      }

      adjacency
        .entry(edge.source.clone())
        .or_default()
        .push(Dependent {
          target_id: edge.target.clone(),
          source_handle: edge.source_handle().to_string(),
          target_handle: edge.target_handle().to_string(),
        });

      *in_degree.entry(edge.target.clone()).or_default() += 1;

      let upstream = ancestors.entry(edge.target.clone()).or_default();
      if !upstream.contains(&edge.source) {
        upstream.push(edge.source.clone());
      }
    }

    Self {
      node_ids,
      adjacency,
      in_degree,
      ancestors,
    }
  }

  /// Node ids in declaration order.
  pub fn node_ids(&self) -> &[String] {
    &self.node_ids
  }

  pub fn len(&self) -> usize {
    self.node_ids.len()
  }

  pub fn is_empty(&self) -> bool {
    self.node_ids.is_empty()
  }

  pub fn contains(&self, node_id: &str) -> bool {
    self.in_degree.contains_key(node_id)
  }

  /// Get downstream connections for a given node.
  pub fn dependents(&self, node_id: &str) -> &[Dependent] {
    self
      .adjacency
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Get direct upstream nodes for a given node.
  pub fn ancestors(&self, node_id: &str) -> &[String] {
    self
      .ancestors
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Number of incoming edges; zero for unknown nodes.
  pub fn in_degree(&self, node_id: &str) -> usize {
    self.in_degree.get(node_id).copied().unwrap_or(0)
  }

  /// The full in-degree map.
  pub fn in_degrees(&self) -> &HashMap<String, usize> {
    &self.in_degree
  }

  /// The given nodes plus everything reachable by walking edges backward.
  ///
  /// Ids that are not in the graph are dropped.
  pub fn ancestor_closure<I>(&self, targets: I) -> BTreeSet<String>
  where
    I: IntoIterator,
    I::Item: AsRef<str>,
  {
    self.closure(targets, |id| {
      self.ancestors(id).iter().map(String::as_str).collect()
    })
  }

  /// The given nodes plus everything reachable by walking edges forward.
  ///
  /// Ids that are not in the graph are dropped.
  pub fn downstream_closure<I>(&self, seeds: I) -> BTreeSet<String>
  where
    I: IntoIterator,
    I::Item: AsRef<str>,
  {
    self.closure(seeds, |id| {
      self
        .dependents(id)
        .iter()
        .map(|d| d.target_id.as_str())
        .collect()
    })
  }

  /// Breadth-first walk from `start` following `next`.
  fn closure<'g, I, F>(&'g self, start: I, next: F) -> BTreeSet<String>
  where
    I: IntoIterator,
    I::Item: AsRef<str>,
    F: Fn(&'g str) -> Vec<&'g str>,
  {
    let mut seen: HashSet<&'g str> = HashSet::new();
    let mut queue: VecDeque<&'g str> = VecDeque::new();

    for id in start {
      if let Some((known, _)) = self.in_degree.get_key_value(id.as_ref()) {
        if seen.insert(known.as_str()) {
          queue.push_back(known.as_str());
        }
      }
    }

    while let Some(id) = queue.pop_front() {
      for neighbor in next(id) {
        if seen.insert(neighbor) {
          queue.push_back(neighbor);
        }
      }
    }

    seen.into_iter().map(str::to_string).collect()
  }
}
