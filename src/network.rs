//! The contact graph.
//!
//! Edges are undirected in the model but stored as a pair of directed edges,
//! one in each agent's neighbor list. Neighbor lists keep the order in which
//! edges were added; the susceptible handler scans them in that order, so the
//! order is part of the model's behavior.
//!
//! `init_small_world` builds the graph the model normally runs on: a ring
//! lattice followed by degree-preserving edge swaps.
use log::{debug, trace};

use crate::agents::{AgentId, ContextAgentsExt};
use crate::context::Context;
use crate::define_data_plugin;
use crate::define_rng;
use crate::error::ModelError;
use crate::hashing::HashSet;
use crate::random::ContextRandomExt;

define_rng!(NetworkRng);

#[derive(Default)]
struct NetworkData {
    neighbors: Vec<Vec<AgentId>>,
}

impl NetworkData {
    fn add_edge(&mut self, agent: AgentId, neighbor: AgentId) -> Result<(), ModelError> {
        if agent == neighbor {
            return Err(ModelError::NetworkError(format!(
                "Cannot make edge from agent {agent} to itself"
            )));
        }

        if agent.0 >= self.neighbors.len() {
            self.neighbors.resize_with(agent.0 + 1, Vec::new);
        }
        let edges = &mut self.neighbors[agent.0];
        if edges.contains(&neighbor) {
            return Err(ModelError::NetworkError(format!(
                "Edge from agent {agent} to agent {neighbor} already exists"
            )));
        }
        edges.push(neighbor);
        Ok(())
    }

    fn get_neighbors(&self, agent: AgentId) -> &[AgentId] {
        self.neighbors.get(agent.0).map_or(&[], Vec::as_slice)
    }
}

define_data_plugin!(NetworkPlugin, NetworkData, NetworkData::default());

pub trait ContextNetworkExt {
    /// Adds a directed edge from `agent` to `neighbor`.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::NetworkError` if either agent does not exist, the
    /// edge is a self loop, or the edge already exists.
    fn add_edge(&mut self, agent: AgentId, neighbor: AgentId) -> Result<(), ModelError>;

    /// Adds an undirected edge, i.e. a directed edge in each direction.
    ///
    /// # Errors
    ///
    /// Same as `add_edge`; nothing is added if either direction fails.
    fn add_edge_bidi(&mut self, agent1: AgentId, agent2: AgentId) -> Result<(), ModelError>;

    /// The neighbors of `agent` in the order their edges were added.
    fn get_neighbors(&self, agent: AgentId) -> &[AgentId];

    fn has_edge(&self, agent: AgentId, neighbor: AgentId) -> bool;

    fn get_degree(&self, agent: AgentId) -> usize;

    /// Agents with exactly `degree` neighbors, in ascending id order.
    fn find_agents_by_degree(&self, degree: usize) -> Vec<AgentId>;

    /// The number of directed edges in the graph.
    fn count_edges(&self) -> usize;
}

impl ContextNetworkExt for Context {
    fn add_edge(&mut self, agent: AgentId, neighbor: AgentId) -> Result<(), ModelError> {
        let population = self.get_population();
        for id in [agent, neighbor] {
            if id.0 >= population {
                return Err(ModelError::NetworkError(format!(
                    "Agent {id} does not exist"
                )));
            }
        }
        self.get_data_mut(NetworkPlugin).add_edge(agent, neighbor)
    }

    fn add_edge_bidi(&mut self, agent1: AgentId, agent2: AgentId) -> Result<(), ModelError> {
        if self.has_edge(agent2, agent1) {
            return Err(ModelError::NetworkError(format!(
                "Edge from agent {agent2} to agent {agent1} already exists"
            )));
        }
        self.add_edge(agent1, agent2)?;
        self.add_edge(agent2, agent1)
    }

    fn get_neighbors(&self, agent: AgentId) -> &[AgentId] {
        self.get_data(NetworkPlugin)
            .map(|data_container| data_container.get_neighbors(agent))
            .unwrap_or(&[])
    }

    fn has_edge(&self, agent: AgentId, neighbor: AgentId) -> bool {
        self.get_neighbors(agent).contains(&neighbor)
    }

    fn get_degree(&self, agent: AgentId) -> usize {
        self.get_neighbors(agent).len()
    }

    fn find_agents_by_degree(&self, degree: usize) -> Vec<AgentId> {
        (0..self.get_population())
            .map(AgentId)
            .filter(|agent| self.get_degree(*agent) == degree)
            .collect()
    }

    fn count_edges(&self) -> usize {
        self.get_data(NetworkPlugin).map_or(0, |data_container| {
            data_container.neighbors.iter().map(Vec::len).sum()
        })
    }
}

/// The undirected edges of a ring lattice in which every agent is linked to
/// its `degree / 2` successors, so every agent ends up with `degree` neighbors.
fn ring_lattice(population: usize, degree: usize) -> Vec<(usize, usize)> {
    let mut edges = Vec::with_capacity(population * degree / 2);
    for agent in 0..population {
        for offset in 1..=degree / 2 {
            edges.push((agent, (agent + offset) % population));
        }
    }
    edges
}

fn undirected(a: usize, b: usize) -> (usize, usize) {
    (a.min(b), a.max(b))
}

/// Makes `floor(proportion * edges.len())` attempts to swap the endpoints of
/// two edges chosen uniformly at random: `(a, b), (c, d)` becomes
/// `(a, d), (c, b)`. An attempt that would create a self loop or a duplicate
/// edge is skipped. Every agent keeps its degree.
fn rewire_preserving_degree(context: &Context, edges: &mut [(usize, usize)], proportion: f64) {
    if edges.len() < 2 {
        return;
    }
    let mut present: HashSet<(usize, usize)> =
        edges.iter().map(|&(a, b)| undirected(a, b)).collect();

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let attempts = (proportion * edges.len() as f64).floor() as usize;
    let mut swapped = 0;
    for _ in 0..attempts {
        let i = context.sample_range(NetworkRng, 0..edges.len());
        let j = context.sample_range(NetworkRng, 0..edges.len());
        if i == j {
            continue;
        }
        let (a, b) = edges[i];
        let (c, d) = edges[j];
        if a == d
            || c == b
            || present.contains(&undirected(a, d))
            || present.contains(&undirected(c, b))
        {
            continue;
        }
        present.remove(&undirected(a, b));
        present.remove(&undirected(c, d));
        present.insert(undirected(a, d));
        present.insert(undirected(c, b));
        edges[i] = (a, d);
        edges[j] = (c, b);
        swapped += 1;
    }
    trace!("rewired {swapped} of {attempts} attempted edge pairs");
}

/// Builds a small-world contact graph over the current population.
///
/// # Errors
///
/// Returns `ModelError::NetworkError` if the population is empty,
/// `average_degree` is zero, odd, or not smaller than the population, or the
/// graph already has edges, and `ModelError::IllegalParameterValue` if
/// `rewiring` is not in `[0, 1]`.
pub fn init_small_world(
    context: &mut Context,
    average_degree: usize,
    rewiring: f64,
) -> Result<(), ModelError> {
    let population = context.get_population();
    if population == 0 {
        return Err(ModelError::NetworkError(
            "Cannot build a contact graph for an empty population".to_string(),
        ));
    }
    if average_degree == 0 {
        return Err(ModelError::NetworkError(
            "An average degree of 0 gives an empty contact graph".to_string(),
        ));
    }
    if average_degree % 2 != 0 {
        return Err(ModelError::NetworkError(format!(
            "The average degree must be even, got {average_degree}"
        )));
    }
    if average_degree >= population {
        return Err(ModelError::NetworkError(format!(
            "The average degree ({average_degree}) must be smaller than the population ({population})"
        )));
    }
    if !rewiring.is_finite() || !(0.0..=1.0).contains(&rewiring) {
        return Err(ModelError::IllegalParameterValue(format!(
            "rewiring proportion is {rewiring}, expected a value in [0, 1]"
        )));
    }
    if context.count_edges() > 0 {
        return Err(ModelError::NetworkError(
            "The contact graph has already been built".to_string(),
        ));
    }

    let mut edges = ring_lattice(population, average_degree);
    rewire_preserving_degree(context, &mut edges, rewiring);
    for (a, b) in edges {
        context.add_edge_bidi(AgentId(a), AgentId(b))?;
    }
    debug!(
        "built small-world graph: {population} agents, degree {average_degree}, rewiring {rewiring}"
    );
    Ok(())
}
