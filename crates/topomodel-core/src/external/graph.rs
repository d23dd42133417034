use crate::core::element::Element;
use crate::core::models::connection::Bond;
use crate::core::models::ids::SiteId;
use crate::core::models::site::Site;
use crate::core::potentials::{AtomType, BondType, ParametricPotential, PotentialKey};
use crate::core::units::quantity::Quantity;
use crate::engine::error::TopologyError;
use crate::engine::topology::Topology;
use nalgebra::Point3;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConversionError {
    #[error("Graph cannot be read as a topology: {0}")]
    InvalidStructure(String),
    #[error(transparent)]
    Topology(#[from] TopologyError),
}

/// Node payload: a site with its atom type inlined.
#[derive(Debug, Clone)]
pub struct GraphSite {
    pub name: String,
    pub position: Quantity<Point3<f64>>,
    pub charge: Option<Quantity>,
    pub mass: Option<Quantity>,
    pub element: Option<&'static Element>,
    pub atom_type: Option<AtomType>,
}

impl GraphSite {
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_site(&Site::new(name), None)
    }

    fn from_site(site: &Site, atom_type: Option<AtomType>) -> Self {
        Self {
            name: site.name.clone(),
            position: site.position.clone(),
            charge: site.charge.clone(),
            mass: site.mass.clone(),
            element: site.element,
            atom_type,
        }
    }
}

/// Edge payload: a bond's name with its bond type inlined.
#[derive(Debug, Clone)]
pub struct GraphBond {
    pub name: String,
    pub bond_type: Option<BondType>,
}

impl Default for GraphBond {
    fn default() -> Self {
        Self {
            name: "Bond".to_string(),
            bond_type: None,
        }
    }
}

/// Builds an undirected graph with one node per site and one edge per bond.
///
/// Types are cloned out of the topology's pools. Member-type handles on bond
/// types only mean something inside their topology and are cleared.
pub fn to_graph(topology: &Topology) -> UnGraph<GraphSite, GraphBond> {
    let mut graph = UnGraph::with_capacity(topology.n_sites(), topology.n_bonds());
    let mut nodes: HashMap<SiteId, NodeIndex> = HashMap::with_capacity(topology.n_sites());

    for (id, site) in topology.sites() {
        let atom_type = site
            .atom_type
            .and_then(|t| topology.atom_type(t))
            .cloned();
        nodes.insert(id, graph.add_node(GraphSite::from_site(site, atom_type)));
    }

    for (_, bond) in topology.bonds() {
        let [a, b] = *bond.members();
        let (Some(&a), Some(&b)) = (nodes.get(&a), nodes.get(&b)) else {
            continue;
        };
        let bond_type = bond
            .connection_type
            .and_then(|t| topology.bond_type(t))
            .cloned()
            .map(|mut t| {
                t.set_member_types(None);
                t
            });
        graph.add_edge(
            a,
            b,
            GraphBond {
                name: bond.name.clone(),
                bond_type,
            },
        );
    }
    graph
}

/// Reads a topology back from a graph built like [`to_graph`]'s output.
///
/// Sites and bonds are added without type updates and the registries are
/// rebuilt once at the end. Types with equal registry keys are pooled once,
/// so sites that shared a type before the round trip share it again.
///
/// # Errors
///
/// Returns [`ConversionError::InvalidStructure`] for self-loops and parallel
/// edges.
#[instrument(skip_all, name = "from_graph")]
pub fn from_graph(graph: &UnGraph<GraphSite, GraphBond>) -> Result<Topology, ConversionError> {
    let mut topology = Topology::new();
    let mut atom_types: Vec<(PotentialKey, _)> = Vec::new();
    let mut bond_types: Vec<(PotentialKey, _)> = Vec::new();
    let mut sites: Vec<SiteId> = Vec::with_capacity(graph.node_count());

    for node in graph.node_indices() {
        let data = &graph[node];
        let mut site = Site::new(data.name.clone());
        site.position = data.position.clone();
        site.charge = data.charge.clone();
        site.mass = data.mass.clone();
        site.element = data.element;
        if let Some(atom_type) = &data.atom_type {
            site.atom_type = Some(pool_once(&mut atom_types, atom_type, |t| {
                topology.add_atom_type(t)
            }));
        }
        sites.push(topology.add_site(site, false)?);
    }

    let mut seen: HashSet<(usize, usize)> = HashSet::with_capacity(graph.edge_count());
    for edge in graph.edge_references() {
        let (a, b) = (edge.source().index(), edge.target().index());
        if a == b {
            return Err(ConversionError::InvalidStructure(format!(
                "self-loop on site '{}'",
                graph[edge.source()].name
            )));
        }
        if !seen.insert((a.min(b), a.max(b))) {
            return Err(ConversionError::InvalidStructure(format!(
                "more than one edge between '{}' and '{}'",
                graph[edge.source()].name,
                graph[edge.target()].name
            )));
        }
        let data = edge.weight();
        let mut bond = Bond::new([sites[a], sites[b]]).with_name(data.name.clone());
        if let Some(bond_type) = &data.bond_type {
            let mut bond_type = bond_type.clone();
            bond_type.set_member_types(None);
            bond.connection_type = Some(pool_once(&mut bond_types, &bond_type, |t| {
                topology.add_bond_type(t)
            }));
        }
        topology.add_connection(bond, false)?;
    }

    topology.update_topology();
    debug!(
        sites = topology.n_sites(),
        bonds = topology.n_bonds(),
        "Topology read from graph"
    );
    Ok(topology)
}

fn pool_once<T, K>(seen: &mut Vec<(PotentialKey, K)>, value: &T, add: impl FnOnce(T) -> K) -> K
where
    T: ParametricPotential,
    K: Copy,
{
    let key = value.key();
    if let Some((_, id)) = seen.iter().find(|(k, _)| *k == key) {
        return *id;
    }
    let id = add(value.clone());
    seen.push((key, id));
    id
}
