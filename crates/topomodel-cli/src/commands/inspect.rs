use crate::cli::InspectArgs;
use crate::error::{CliError, Result};
use std::fmt;
use topomodel::core::element::element_by_atom_type;
use topomodel::core::forcefield::ForceField;
use topomodel::core::models::site::Site;
use topomodel::engine::Topology;
use tracing::{debug, info, warn};

pub fn run(args: InspectArgs) -> Result<()> {
    let forcefield = ForceField::load(&args.forcefield).map_err(|e| CliError::ForceField {
        path: args.forcefield.clone(),
        source: e,
    })?;
    info!("Loaded force field '{}' v{}.", forcefield.name, forcefield.version);

    let topology = build_topology(&forcefield, args.combining_rule.as_deref())?;
    print!("{}", Summary::new(&forcefield, &topology));
    Ok(())
}

/// One site per library atom type, each registered as it is added.
fn build_topology(forcefield: &ForceField, combining_rule: Option<&str>) -> Result<Topology> {
    let mut topology = Topology::with_name(forcefield.name.clone());
    topology.set_combining_rule(combining_rule.unwrap_or(forcefield.combining_rule.as_str()))?;

    for (name, atom_type) in forcefield.atom_types() {
        let element = element_by_atom_type(atom_type);
        if element.is_none() {
            warn!("No element matches atom type '{}'.", name);
        }
        let type_id = topology.add_atom_type(atom_type.clone());
        let mut site = Site::new(name).with_atom_type(type_id);
        site.element = element;
        topology.add_site(site, true)?;
    }
    debug!(
        sites = topology.n_sites(),
        atom_types = topology.atom_types().len(),
        "Demonstration topology built"
    );
    Ok(topology)
}

struct Summary {
    name: String,
    combining_rule: &'static str,
    library_counts: [(&'static str, usize); 6],
    sites: usize,
    registered_atom_types: Vec<(String, Option<&'static str>)>,
    atom_type_expressions: Vec<String>,
}

impl Summary {
    fn new(forcefield: &ForceField, topology: &Topology) -> Self {
        let registered_atom_types = topology
            .atom_types()
            .into_iter()
            .map(|t| (t.name().to_string(), element_by_atom_type(t).map(|e| e.symbol)))
            .collect();
        Self {
            name: topology.name().to_string(),
            combining_rule: topology.combining_rule().as_str(),
            library_counts: [
                ("atom types", forcefield.n_atom_types()),
                ("bond types", forcefield.bond_types().len()),
                ("angle types", forcefield.angle_types().len()),
                ("dihedral types", forcefield.dihedral_types().len()),
                ("improper types", forcefield.improper_types().len()),
                ("pair potential types", forcefield.pairpotential_types().len()),
            ],
            sites: topology.n_sites(),
            registered_atom_types,
            atom_type_expressions: topology
                .atom_type_expressions()
                .into_iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Force field: {}", self.name)?;
        writeln!(f, "Combining rule: {}", self.combining_rule)?;
        writeln!(f, "Library:")?;
        for (label, count) in &self.library_counts {
            writeln!(f, "  {:<22}{}", label, count)?;
        }
        writeln!(f, "Topology: {} sites", self.sites)?;
        writeln!(f, "Registered atom types:")?;
        for (index, (name, symbol)) in self.registered_atom_types.iter().enumerate() {
            writeln!(f, "  [{}] {} ({})", index, name, symbol.unwrap_or("?"))?;
        }
        writeln!(f, "Atom type expressions:")?;
        for expression in &self.atom_type_expressions {
            writeln!(f, "  {}", expression)?;
        }
        Ok(())
    }
}
