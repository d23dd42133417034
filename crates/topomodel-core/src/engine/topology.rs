use super::arena::OrderedArena;
use super::error::TopologyError;
use super::member::TopologyMember;
use super::pairs::PairPotentialTable;
use super::registry::TypeRegistry;
use crate::core::expression::Expression;
use crate::core::models::connection::{
    Angle, AnyConnection, Bond, Connection, ConnectionTypeKey, Dihedral, Improper,
};
use crate::core::models::ids::{
    AngleId, AngleKey, AngleTypeId, AngleTypeKey, AtomTypeId, AtomTypeKey, BondId, BondKey,
    BondTypeId, BondTypeKey, ConnectionId, DihedralId, DihedralKey, DihedralTypeId,
    DihedralTypeKey, Handle, ImproperId, ImproperKey, ImproperTypeId, ImproperTypeKey,
    OwnerToken, SiteId, SiteKey, SubTopologyId, SubTopologyKey,
};
use crate::core::models::simulation_box::SimulationBox;
use crate::core::models::site::Site;
use crate::core::models::subtopology::SubTopology;
use crate::core::potentials::{
    AngleType, AnyPotential, AtomType, BondType, CombiningRule, DihedralType, ImproperType,
    PairPotentialType, ParametricPotential, PotentialKind,
};
use crate::core::units::unit::Unit;
use nalgebra::Point3;
use slotmap::Key;
use tracing::{debug, instrument};

const DEFAULT_NAME: &str = "Topology";

/// Outcome of storing one connection.
struct Stored<K> {
    id: K,
    inserted: bool,
    folded: bool,
}

impl<K> Stored<K> {
    fn map<J>(self, f: impl FnOnce(K) -> J) -> Stored<J> {
        Stored {
            id: f(self.id),
            inserted: self.inserted,
            folded: self.folded,
        }
    }
}

macro_rules! type_kind_api {
    (
        $ty:ident, $id:ident, $pool:ident, $registry:ident,
        add: $add:ident, get: $get:ident, get_mut: $get_mut:ident, edit: $edit:ident,
        list: $list:ident, ids: $ids:ident, expressions: $exprs:ident, update: $update:ident $(,)?
    ) => {
        #[doc = concat!("Moves a [`", stringify!($ty), "`] into this topology's pool and returns its shared handle.")]
        ///
        /// Pooling alone does not register the type; that happens when a member
        /// holding the handle is added with `update_types`, or on a rescan.
        pub fn $add(&mut self, value: $ty) -> $id {
            self.$pool.insert(value)
        }

        pub fn $get(&self, id: $id) -> Option<&$ty> {
            self.$pool.get(id)
        }

        /// Direct mutable access to a pooled type.
        ///
        /// The change is visible through every member holding the handle, but
        /// registries keep their old keys until the next rescan.
        pub fn $get_mut(&mut self, id: $id) -> Option<&mut $ty> {
            self.$pool.get_mut(id)
        }

        /// Mutates a pooled type, then rescans the registry of its kind.
        ///
        /// # Errors
        ///
        /// Returns [`TopologyError::UnknownType`] if `id` was not issued by
        /// this topology.
        pub fn $edit<R>(
            &mut self,
            id: $id,
            edit: impl FnOnce(&mut $ty) -> R,
        ) -> Result<R, TopologyError> {
            let value = self.$pool.get_mut(id).ok_or(TopologyError::UnknownType {
                kind: <$ty as ParametricPotential>::KIND,
            })?;
            let result = edit(value);
            self.$update();
            Ok(result)
        }

        /// Registered types, in registry order.
        pub fn $list(&self) -> Vec<&$ty> {
            self.$registry
                .representatives()
                .filter_map(|id| self.$pool.get(id))
                .collect()
        }

        pub fn $ids(&self) -> Vec<$id> {
            self.$registry.representatives().collect()
        }

        /// Distinct expressions among the registered types.
        pub fn $exprs(&self) -> Vec<&Expression> {
            unique_expressions(self.$list().into_iter().map(|t| t.expression()))
        }
    };
}

/// A molecular topology: sites, the connections between them, and the
/// parameter types that describe both.
///
/// Types live in per-kind pools owned by the topology. Sites and connections
/// hold handles into those pools, so one pooled type is shared by every member
/// that references it. On top of the pools the topology keeps registries:
/// ordered, de-duplicated lists of the types actually in use, keyed by
/// type name plus potential value. Registries are caches. They grow
/// incrementally when members are added with `update_types`, and are rebuilt
/// wholesale by [`update_topology`](Self::update_topology) and the per-kind
/// `update_*` methods; in-place edits through the `*_mut` accessors leave
/// them stale until then.
///
/// There is no removal API for sites or connections. Pair potentials can be
/// removed.
///
/// Every handle carries the owner token of the topology that issued it, and
/// handles from another topology are rejected even when a slot with the same
/// index exists here. A clone keeps its source's token, so handles issued
/// before cloning resolve in both copies.
#[derive(Debug, Clone)]
pub struct Topology {
    name: String,
    sites: OrderedArena<SiteKey, Site>,
    bonds: OrderedArena<BondKey, Bond>,
    angles: OrderedArena<AngleKey, Angle>,
    dihedrals: OrderedArena<DihedralKey, Dihedral>,
    impropers: OrderedArena<ImproperKey, Improper>,
    /// Global insertion order across all connection kinds.
    connections: Vec<ConnectionId>,
    subtopologies: OrderedArena<SubTopologyKey, SubTopology>,
    simulation_box: Option<SimulationBox>,
    combining_rule: CombiningRule,
    typed: bool,
    atom_type_pool: OrderedArena<AtomTypeKey, AtomType>,
    bond_type_pool: OrderedArena<BondTypeKey, BondType>,
    angle_type_pool: OrderedArena<AngleTypeKey, AngleType>,
    dihedral_type_pool: OrderedArena<DihedralTypeKey, DihedralType>,
    improper_type_pool: OrderedArena<ImproperTypeKey, ImproperType>,
    atom_types: TypeRegistry<AtomTypeId>,
    bond_types: TypeRegistry<BondTypeId>,
    angle_types: TypeRegistry<AngleTypeId>,
    dihedral_types: TypeRegistry<DihedralTypeId>,
    improper_types: TypeRegistry<ImproperTypeId>,
    pair_potentials: PairPotentialTable,
}

impl Default for Topology {
    fn default() -> Self {
        let owner = OwnerToken::fresh();
        Self {
            name: DEFAULT_NAME.to_string(),
            sites: OrderedArena::new(owner),
            bonds: OrderedArena::new(owner),
            angles: OrderedArena::new(owner),
            dihedrals: OrderedArena::new(owner),
            impropers: OrderedArena::new(owner),
            connections: Vec::new(),
            subtopologies: OrderedArena::new(owner),
            simulation_box: None,
            combining_rule: CombiningRule::default(),
            typed: false,
            atom_type_pool: OrderedArena::new(owner),
            bond_type_pool: OrderedArena::new(owner),
            angle_type_pool: OrderedArena::new(owner),
            dihedral_type_pool: OrderedArena::new(owner),
            improper_type_pool: OrderedArena::new(owner),
            atom_types: TypeRegistry::default(),
            bond_types: TypeRegistry::default(),
            angle_types: TypeRegistry::default(),
            dihedral_types: TypeRegistry::default(),
            improper_types: TypeRegistry::default(),
            pair_potentials: PairPotentialTable::default(),
        }
    }
}

impl Topology {
    /// Creates an empty topology named `"Topology"` using the Lorentz rule.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn combining_rule(&self) -> CombiningRule {
        self.combining_rule
    }

    /// Sets the combining rule from its name.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::InvalidCombiningRule`] for anything other than
    /// `"lorentz"` or `"geometric"`; the previous rule is kept.
    pub fn set_combining_rule(&mut self, rule: &str) -> Result<(), TopologyError> {
        self.combining_rule = rule.parse()?;
        Ok(())
    }

    /// The stored "typed" flag.
    ///
    /// Set when an update finds types, or explicitly through
    /// [`set_typed`](Self::set_typed). It can disagree with
    /// [`is_typed`](Self::is_typed), which inspects the members.
    pub fn typed(&self) -> bool {
        self.typed
    }

    pub fn set_typed(&mut self, typed: bool) {
        self.typed = typed;
    }

    /// Whether any site or connection currently holds a type.
    pub fn is_typed(&self) -> bool {
        self.sites.values().any(Site::is_typed)
            || self.bonds.values().any(Bond::is_typed)
            || self.angles.values().any(Angle::is_typed)
            || self.dihedrals.values().any(Dihedral::is_typed)
            || self.impropers.values().any(Improper::is_typed)
    }

    pub fn simulation_box(&self) -> Option<&SimulationBox> {
        self.simulation_box.as_ref()
    }

    pub fn set_box(&mut self, simulation_box: Option<SimulationBox>) {
        self.simulation_box = simulation_box;
    }

    // --- Sites and connections ---

    /// Appends a site.
    ///
    /// With `update_types`, the site's atom type is folded into the atom-type
    /// registry. If an equal key is already registered, the site is re-pointed
    /// at the registered handle.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::UnknownType`] if the site's atom-type handle
    /// was not issued by this topology.
    pub fn add_site(&mut self, mut site: Site, update_types: bool) -> Result<SiteId, TopologyError> {
        if let Some(type_id) = site.atom_type {
            let atom_type = self
                .atom_type_pool
                .get(type_id)
                .ok_or(TopologyError::UnknownType {
                    kind: PotentialKind::Atom,
                })?;
            if update_types {
                site.atom_type = Some(self.atom_types.fold(type_id, atom_type.key()));
                self.typed = true;
            }
        }
        Ok(self.sites.insert(site))
    }

    /// Adds a bond, angle, dihedral, or improper.
    ///
    /// Every member must already be a site of this topology. A connection with
    /// the same ordered members and an equal type as a stored one is not stored
    /// again; the existing handle is returned instead.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::UnknownSite`] for a foreign member, or
    /// [`TopologyError::UnknownType`] for a foreign type handle.
    pub fn add_connection(
        &mut self,
        connection: impl Into<AnyConnection>,
        update_types: bool,
    ) -> Result<ConnectionId, TopologyError> {
        let stored = match connection.into() {
            AnyConnection::Bond(c) => store_connection(
                &self.sites,
                &mut self.bonds,
                &self.bond_type_pool,
                &mut self.bond_types,
                c,
                update_types,
            )?
            .map(ConnectionId::Bond),
            AnyConnection::Angle(c) => store_connection(
                &self.sites,
                &mut self.angles,
                &self.angle_type_pool,
                &mut self.angle_types,
                c,
                update_types,
            )?
            .map(ConnectionId::Angle),
            AnyConnection::Dihedral(c) => store_connection(
                &self.sites,
                &mut self.dihedrals,
                &self.dihedral_type_pool,
                &mut self.dihedral_types,
                c,
                update_types,
            )?
            .map(ConnectionId::Dihedral),
            AnyConnection::Improper(c) => store_connection(
                &self.sites,
                &mut self.impropers,
                &self.improper_type_pool,
                &mut self.improper_types,
                c,
                update_types,
            )?
            .map(ConnectionId::Improper),
        };
        if stored.inserted {
            self.connections.push(stored.id);
        }
        if stored.folded {
            self.typed = true;
        }
        Ok(stored.id)
    }

    /// Adds a subtopology.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::UnknownSite`] if it lists a site that does not
    /// belong to this topology.
    pub fn add_subtopology(&mut self, subtop: SubTopology) -> Result<SubTopologyId, TopologyError> {
        if let Some(&missing) = subtop.sites().iter().find(|&&s| !self.sites.contains(s)) {
            return Err(TopologyError::UnknownSite(missing));
        }
        Ok(self.subtopologies.insert(subtop))
    }

    /// Adds an existing site to an existing subtopology. Returns `false` if
    /// the site was already a member.
    pub fn add_site_to_subtopology(
        &mut self,
        subtop: SubTopologyId,
        site: SiteId,
    ) -> Result<bool, TopologyError> {
        if !self.sites.contains(site) {
            return Err(TopologyError::UnknownSite(site));
        }
        let target = self
            .subtopologies
            .get_mut(subtop)
            .ok_or(TopologyError::UnknownSubTopology(subtop))?;
        Ok(target.push(site))
    }

    // --- Type pools and registries ---

    type_kind_api!(
        AtomType, AtomTypeId, atom_type_pool, atom_types,
        add: add_atom_type, get: atom_type, get_mut: atom_type_mut, edit: edit_atom_type,
        list: atom_types, ids: atom_type_ids, expressions: atom_type_expressions,
        update: update_atom_types,
    );

    type_kind_api!(
        BondType, BondTypeId, bond_type_pool, bond_types,
        add: add_bond_type, get: bond_type, get_mut: bond_type_mut, edit: edit_bond_type,
        list: bond_types, ids: bond_type_ids, expressions: bond_type_expressions,
        update: update_bond_types,
    );

    type_kind_api!(
        AngleType, AngleTypeId, angle_type_pool, angle_types,
        add: add_angle_type, get: angle_type, get_mut: angle_type_mut, edit: edit_angle_type,
        list: angle_types, ids: angle_type_ids, expressions: angle_type_expressions,
        update: update_angle_types,
    );

    type_kind_api!(
        DihedralType, DihedralTypeId, dihedral_type_pool, dihedral_types,
        add: add_dihedral_type, get: dihedral_type, get_mut: dihedral_type_mut,
        edit: edit_dihedral_type, list: dihedral_types, ids: dihedral_type_ids,
        expressions: dihedral_type_expressions, update: update_dihedral_types,
    );

    type_kind_api!(
        ImproperType, ImproperTypeId, improper_type_pool, improper_types,
        add: add_improper_type, get: improper_type, get_mut: improper_type_mut,
        edit: edit_improper_type, list: improper_types, ids: improper_type_ids,
        expressions: improper_type_expressions, update: update_improper_types,
    );

    /// All registered connection types: bonds, then angles, dihedrals and
    /// impropers.
    pub fn connection_types(&self) -> Vec<AnyPotential<'_>> {
        let mut types: Vec<AnyPotential<'_>> = Vec::new();
        types.extend(self.bond_types().into_iter().map(AnyPotential::from));
        types.extend(self.angle_types().into_iter().map(AnyPotential::from));
        types.extend(self.dihedral_types().into_iter().map(AnyPotential::from));
        types.extend(self.improper_types().into_iter().map(AnyPotential::from));
        types
    }

    pub fn connection_type_expressions(&self) -> Vec<&Expression> {
        unique_expressions(
            self.connection_types()
                .into_iter()
                .map(|t| t.potential().expression()),
        )
    }

    /// Rebuilds every registry from the current sites and connections.
    #[instrument(skip_all, name = "update_topology")]
    pub fn update_topology(&mut self) {
        self.update_atom_types();
        self.update_connection_types();
        debug!(
            atom_types = self.atom_types.len(),
            bond_types = self.bond_types.len(),
            angle_types = self.angle_types.len(),
            dihedral_types = self.dihedral_types.len(),
            improper_types = self.improper_types.len(),
            "Topology registries rebuilt"
        );
    }

    /// Rebuilds the atom-type registry from the sites, in site order, and
    /// re-points every site at the handle registered for its key.
    pub fn update_atom_types(&mut self) {
        let pool = &self.atom_type_pool;
        let scan: Vec<_> = self
            .sites
            .values()
            .filter_map(|site| site.atom_type)
            .filter_map(|id| pool.get(id).map(|t| (id, t.key())))
            .collect();
        self.atom_types.rebuild(scan);
        let registry = &self.atom_types;
        for site in self.sites.values_mut() {
            let representative = site
                .atom_type
                .and_then(|id| pool.get(id))
                .and_then(|t| registry.representative(&t.key()));
            if representative.is_some() {
                site.atom_type = representative;
            }
        }
        if !self.atom_types.is_empty() {
            self.typed = true;
        }
    }

    pub fn update_connection_types(&mut self) {
        self.update_bond_types();
        self.update_angle_types();
        self.update_dihedral_types();
        self.update_improper_types();
    }

    pub fn update_bond_types(&mut self) {
        if rescan_connections(&mut self.bonds, &self.bond_type_pool, &mut self.bond_types) {
            self.typed = true;
        }
    }

    pub fn update_angle_types(&mut self) {
        if rescan_connections(&mut self.angles, &self.angle_type_pool, &mut self.angle_types) {
            self.typed = true;
        }
    }

    pub fn update_dihedral_types(&mut self) {
        if rescan_connections(
            &mut self.dihedrals,
            &self.dihedral_type_pool,
            &mut self.dihedral_types,
        ) {
            self.typed = true;
        }
    }

    pub fn update_improper_types(&mut self) {
        if rescan_connections(
            &mut self.impropers,
            &self.improper_type_pool,
            &mut self.improper_types,
        ) {
            self.typed = true;
        }
    }

    // --- Pair potentials ---

    /// Stores an explicit pair potential, replacing any entry for the same
    /// unordered pair of atom-type keys. Returns the replaced entry.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::MalformedPairPotential`] if `pair` has no
    /// member types, or [`TopologyError::UnknownType`] if a member handle was
    /// not issued by this topology.
    pub fn add_pairpotentialtype(
        &mut self,
        pair: PairPotentialType,
    ) -> Result<Option<PairPotentialType>, TopologyError> {
        let pool = &self.atom_type_pool;
        self.pair_potentials
            .insert(pair, |id| pool.get(id).map(ParametricPotential::key))
    }

    /// Removes the pair potential stored for `members`, in either order, and
    /// returns it. Removing a pair that has no entry is a no-op returning
    /// `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::UnknownType`] if a member handle was not
    /// issued by this topology.
    pub fn remove_pairpotentialtype(
        &mut self,
        members: [AtomTypeId; 2],
    ) -> Result<Option<PairPotentialType>, TopologyError> {
        let pool = &self.atom_type_pool;
        self.pair_potentials
            .remove(members, |id| pool.get(id).map(ParametricPotential::key))
    }

    pub fn pairpotential_type(
        &self,
        a: AtomTypeId,
        b: AtomTypeId,
    ) -> Result<Option<&PairPotentialType>, TopologyError> {
        let pool = &self.atom_type_pool;
        self.pair_potentials
            .get([a, b], |id| pool.get(id).map(ParametricPotential::key))
    }

    pub fn pairpotential_types(&self) -> Vec<&PairPotentialType> {
        self.pair_potentials.iter().collect()
    }

    // --- Queries ---

    /// Position of a member within its kind.
    ///
    /// Sites and connections report their insertion position. Types report
    /// the position of their *current* key in the registry, so a type edited
    /// through a `*_mut` accessor is not found until the next rescan.
    ///
    /// # Errors
    ///
    /// * [`TopologyError::UnsupportedMember`] for subtopologies and pair
    ///   potentials.
    /// * [`TopologyError::MemberNotFound`] if the member is absent.
    pub fn get_index(&self, member: impl Into<TopologyMember>) -> Result<usize, TopologyError> {
        let member = member.into();
        let index = match member {
            TopologyMember::Site(id) => self.sites.position(id),
            TopologyMember::Bond(id) => self.bonds.position(id),
            TopologyMember::Angle(id) => self.angles.position(id),
            TopologyMember::Dihedral(id) => self.dihedrals.position(id),
            TopologyMember::Improper(id) => self.impropers.position(id),
            TopologyMember::AtomType(id) => {
                registry_index(&self.atom_type_pool, &self.atom_types, id)
            }
            TopologyMember::BondType(id) => {
                registry_index(&self.bond_type_pool, &self.bond_types, id)
            }
            TopologyMember::AngleType(id) => {
                registry_index(&self.angle_type_pool, &self.angle_types, id)
            }
            TopologyMember::DihedralType(id) => {
                registry_index(&self.dihedral_type_pool, &self.dihedral_types, id)
            }
            TopologyMember::ImproperType(id) => {
                registry_index(&self.improper_type_pool, &self.improper_types, id)
            }
            TopologyMember::SubTopology(_) | TopologyMember::PairPotentialType(_) => {
                return Err(TopologyError::UnsupportedMember(member.label()));
            }
        };
        index.ok_or_else(|| TopologyError::MemberNotFound(format!("{} {:?}", member.label(), member)))
    }

    /// Whether the member belongs to this topology. Type handles count when
    /// pooled here, registered or not.
    pub fn contains(&self, member: impl Into<TopologyMember>) -> bool {
        match member.into() {
            TopologyMember::Site(id) => self.sites.contains(id),
            TopologyMember::Bond(id) => self.bonds.contains(id),
            TopologyMember::Angle(id) => self.angles.contains(id),
            TopologyMember::Dihedral(id) => self.dihedrals.contains(id),
            TopologyMember::Improper(id) => self.impropers.contains(id),
            TopologyMember::AtomType(id) => self.atom_type_pool.contains(id),
            TopologyMember::BondType(id) => self.bond_type_pool.contains(id),
            TopologyMember::AngleType(id) => self.angle_type_pool.contains(id),
            TopologyMember::DihedralType(id) => self.dihedral_type_pool.contains(id),
            TopologyMember::ImproperType(id) => self.improper_type_pool.contains(id),
            TopologyMember::SubTopology(id) => self.subtopologies.contains(id),
            TopologyMember::PairPotentialType([a, b]) => {
                matches!(self.pairpotential_type(a, b), Ok(Some(_)))
            }
        }
    }

    pub fn n_sites(&self) -> usize {
        self.sites.len()
    }

    pub fn n_connections(&self) -> usize {
        self.connections.len()
    }

    pub fn n_bonds(&self) -> usize {
        self.bonds.len()
    }

    pub fn n_angles(&self) -> usize {
        self.angles.len()
    }

    pub fn n_dihedrals(&self) -> usize {
        self.dihedrals.len()
    }

    pub fn n_impropers(&self) -> usize {
        self.impropers.len()
    }

    pub fn n_subtops(&self) -> usize {
        self.subtopologies.len()
    }

    pub fn site(&self, id: SiteId) -> Option<&Site> {
        self.sites.get(id)
    }

    /// Mutable access to a site. Re-typing a site this way leaves the
    /// atom-type registry stale until [`update_atom_types`](Self::update_atom_types).
    pub fn site_mut(&mut self, id: SiteId) -> Option<&mut Site> {
        self.sites.get_mut(id)
    }

    /// Sites in insertion order.
    pub fn sites(&self) -> impl Iterator<Item = (SiteId, &Site)> {
        self.sites.iter()
    }

    pub fn bond(&self, id: BondId) -> Option<&Bond> {
        self.bonds.get(id)
    }

    pub fn bonds(&self) -> impl Iterator<Item = (BondId, &Bond)> {
        self.bonds.iter()
    }

    pub fn angle(&self, id: AngleId) -> Option<&Angle> {
        self.angles.get(id)
    }

    pub fn angles(&self) -> impl Iterator<Item = (AngleId, &Angle)> {
        self.angles.iter()
    }

    pub fn dihedral(&self, id: DihedralId) -> Option<&Dihedral> {
        self.dihedrals.get(id)
    }

    pub fn dihedrals(&self) -> impl Iterator<Item = (DihedralId, &Dihedral)> {
        self.dihedrals.iter()
    }

    pub fn improper(&self, id: ImproperId) -> Option<&Improper> {
        self.impropers.get(id)
    }

    pub fn impropers(&self) -> impl Iterator<Item = (ImproperId, &Improper)> {
        self.impropers.iter()
    }

    /// Connection handles in global insertion order.
    pub fn connections(&self) -> &[ConnectionId] {
        &self.connections
    }

    pub fn subtopology(&self, id: SubTopologyId) -> Option<&SubTopology> {
        self.subtopologies.get(id)
    }

    pub fn subtopologies(&self) -> impl Iterator<Item = (SubTopologyId, &SubTopology)> {
        self.subtopologies.iter()
    }

    /// Site positions in nanometres, in site order.
    pub fn positions(&self) -> Result<Vec<Point3<f64>>, TopologyError> {
        let nm = Unit::nanometer();
        self.sites
            .values()
            .map(|site| Ok(*site.position.to(&nm)?.value()))
            .collect()
    }
}

fn store_connection<const N: usize, TK, K, P>(
    sites: &OrderedArena<SiteKey, Site>,
    arena: &mut OrderedArena<K, Connection<N, Handle<TK>>>,
    pool: &OrderedArena<TK, P>,
    registry: &mut TypeRegistry<Handle<TK>>,
    mut connection: Connection<N, Handle<TK>>,
    update_types: bool,
) -> Result<Stored<Handle<K>>, TopologyError>
where
    TK: Key,
    Handle<TK>: ConnectionTypeKey,
    K: Key,
    P: ParametricPotential,
{
    if let Some(&missing) = connection.members().iter().find(|&&s| !sites.contains(s)) {
        return Err(TopologyError::UnknownSite(missing));
    }
    let connection_type = match connection.connection_type {
        Some(id) => Some(pool.get(id).ok_or(TopologyError::UnknownType { kind: P::KIND })?),
        None => None,
    };

    let duplicate = arena.iter().find(|(_, existing)| {
        existing.members() == connection.members()
            && match (existing.connection_type, connection_type) {
                (None, None) => true,
                (Some(id), Some(value)) => pool.get(id) == Some(value),
                _ => false,
            }
    });
    if let Some((id, _)) = duplicate {
        debug!(name = %connection.name, "Coalescing duplicate connection");
        return Ok(Stored {
            id,
            inserted: false,
            folded: false,
        });
    }

    let mut folded = false;
    if update_types {
        if let (Some(id), Some(value)) = (connection.connection_type, connection_type) {
            connection.connection_type = Some(registry.fold(id, value.key()));
            folded = true;
        }
    }
    Ok(Stored {
        id: arena.insert(connection),
        inserted: true,
        folded,
    })
}

/// Rebuilds `registry` from the connections in `arena` and re-points each
/// connection at its registered handle. Returns whether any type was found.
fn rescan_connections<const N: usize, TK, K, P>(
    arena: &mut OrderedArena<K, Connection<N, Handle<TK>>>,
    pool: &OrderedArena<TK, P>,
    registry: &mut TypeRegistry<Handle<TK>>,
) -> bool
where
    TK: Key,
    Handle<TK>: ConnectionTypeKey,
    K: Key,
    P: ParametricPotential,
{
    let scan: Vec<_> = arena
        .values()
        .filter_map(|c| c.connection_type)
        .filter_map(|id| pool.get(id).map(|t| (id, t.key())))
        .collect();
    registry.rebuild(scan);
    for connection in arena.values_mut() {
        let representative = connection
            .connection_type
            .and_then(|id| pool.get(id))
            .and_then(|t| registry.representative(&t.key()));
        if representative.is_some() {
            connection.connection_type = representative;
        }
    }
    !registry.is_empty()
}

fn registry_index<K: Key, P: ParametricPotential>(
    pool: &OrderedArena<K, P>,
    registry: &TypeRegistry<Handle<K>>,
    id: Handle<K>,
) -> Option<usize> {
    pool.get(id).and_then(|t| registry.position(&t.key()))
}

fn unique_expressions<'a>(expressions: impl IntoIterator<Item = &'a Expression>) -> Vec<&'a Expression> {
    let mut unique: Vec<&Expression> = Vec::new();
    for expression in expressions {
        if !unique.contains(&expression) {
            unique.push(expression);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::potentials::Potential;
    use crate::core::units::quantity::Quantity;
    use std::collections::BTreeMap;

    fn custom_atom_type(top: &mut Topology, expression: &str) -> AtomTypeId {
        let mut atom_type = AtomType::default();
        atom_type.set_expression(expression).unwrap();
        top.add_atom_type(atom_type)
    }

    mod core_functionality {
        use super::*;

        #[test]
        fn new_topology_is_empty_and_named() {
            let top = Topology::with_name("mytop");
            assert_eq!(top.name(), "mytop");
            assert_eq!(Topology::new().name(), "Topology");
            assert_eq!(top.n_sites(), 0);
            assert_eq!(top.n_connections(), 0);
            assert_eq!(top.n_subtops(), 0);
            assert!(top.simulation_box().is_none());
        }

        #[test]
        fn combining_rule_rejects_unknown_values() {
            let mut top = Topology::new();
            assert_eq!(top.combining_rule(), CombiningRule::Lorentz);
            top.set_combining_rule("geometric").unwrap();
            assert_eq!(top.combining_rule(), CombiningRule::Geometric);
            assert!(matches!(
                top.set_combining_rule("kong"),
                Err(TopologyError::InvalidCombiningRule(_))
            ));
            assert_eq!(top.combining_rule(), CombiningRule::Geometric);
        }

        #[test]
        fn empty_topology_update_yields_empty_registries() {
            let mut top = Topology::new();
            top.update_topology();
            assert_eq!(top.n_sites(), 0);
            assert!(top.atom_types().is_empty());
            assert!(top.atom_type_expressions().is_empty());
            assert_eq!(top.n_connections(), 0);
            assert!(top.connection_types().is_empty());
            assert!(top.connection_type_expressions().is_empty());
            assert!(!top.typed());
        }

        #[test]
        fn box_can_be_set_and_cleared() {
            let mut top = Topology::new();
            top.set_box(Some(SimulationBox::cubic(3.0).unwrap()));
            assert!(top.simulation_box().is_some());
            top.set_box(None);
            assert!(top.simulation_box().is_none());
        }

        #[test]
        fn positions_are_reported_in_nanometres() {
            let mut top = Topology::new();
            let mut site = Site::new("a");
            site.position = Quantity::new(Point3::new(10.0, 0.0, 5.0), Unit::angstrom());
            top.add_site(site, true).unwrap();
            top.add_site(Site::new("b").at(Point3::new(0.1, 0.2, 0.3)), true)
                .unwrap();
            let positions = top.positions().unwrap();
            assert!((positions[0] - Point3::new(1.0, 0.0, 0.5)).norm() < 1e-12);
            assert!((positions[1] - Point3::new(0.1, 0.2, 0.3)).norm() < 1e-12);
        }
    }

    mod site_registration {
        use super::*;

        #[test]
        fn untyped_site_never_registers() {
            for update in [false, true] {
                let mut top = Topology::new();
                top.add_site(Site::new("x"), update).unwrap();
                assert_eq!(top.n_sites(), 1);
                assert!(top.atom_types().is_empty());
            }
        }

        #[test]
        fn typed_site_registers_only_with_update() {
            let mut top = Topology::new();
            let t = top.add_atom_type(AtomType::default());
            top.add_site(Site::new("x").with_atom_type(t), false).unwrap();
            assert!(top.atom_types().is_empty());

            let mut top = Topology::new();
            let t = top.add_atom_type(AtomType::default());
            top.add_site(Site::new("x").with_atom_type(t), true).unwrap();
            assert_eq!(top.atom_types().len(), 1);
        }

        #[test]
        fn equal_key_does_not_grow_registry() {
            let mut top = Topology::new();
            let first = top.add_atom_type(AtomType::default());
            let second = top.add_atom_type(AtomType::default());
            let a = top.add_site(Site::new("a").with_atom_type(first), true).unwrap();
            let b = top.add_site(Site::new("b").with_atom_type(second), true).unwrap();
            assert_eq!(top.atom_types().len(), 1);
            assert_eq!(top.site(b).unwrap().atom_type, Some(first));
            assert_eq!(top.site(a).unwrap().atom_type, Some(first));
        }

        #[test]
        fn foreign_type_handle_is_rejected() {
            let mut other = Topology::new();
            let foreign = other.add_atom_type(AtomType::default());
            let mut top = Topology::new();
            let mine = top.add_atom_type(AtomType::default());
            assert_eq!(foreign.key(), mine.key());
            assert_eq!(
                top.add_site(Site::new("x").with_atom_type(foreign), true),
                Err(TopologyError::UnknownType {
                    kind: PotentialKind::Atom
                })
            );
            assert_eq!(top.n_sites(), 0);
            assert!(top.atom_types().is_empty());
        }

        #[test]
        fn distinct_expressions_give_distinct_entries() {
            let mut top = Topology::new();
            let t1 = custom_atom_type(&mut top, "sigma + epsilon*r");
            let t2 = custom_atom_type(&mut top, "sigma * epsilon*r");
            top.add_site(Site::new("a").with_atom_type(t1), true).unwrap();
            top.add_site(Site::new("b").with_atom_type(t2), true).unwrap();
            assert_eq!(top.atom_types().len(), 2);
            assert_eq!(top.atom_type_expressions().len(), 2);
        }
    }

    mod connection_registration {
        use super::*;

        fn two_sites(top: &mut Topology) -> (SiteId, SiteId) {
            let a = top.add_site(Site::new("a"), true).unwrap();
            let b = top.add_site(Site::new("b"), true).unwrap();
            (a, b)
        }

        #[test]
        fn untyped_bond_never_registers() {
            for update in [false, true] {
                let mut top = Topology::new();
                let (a, b) = two_sites(&mut top);
                top.add_connection(Bond::new([a, b]), update).unwrap();
                assert_eq!(top.n_bonds(), 1);
                assert!(top.bond_types().is_empty());
            }
        }

        #[test]
        fn typed_bond_registers_only_with_update() {
            let mut top = Topology::new();
            let (a, b) = two_sites(&mut top);
            let t = top.add_bond_type(BondType::default());
            top.add_connection(Bond::new([a, b]).with_type(t), false)
                .unwrap();
            assert!(top.connection_types().is_empty());

            let mut top = Topology::new();
            let (a, b) = two_sites(&mut top);
            let t = top.add_bond_type(BondType::default());
            top.add_connection(Bond::new([a, b]).with_type(t), true)
                .unwrap();
            assert_eq!(top.bond_types().len(), 1);
            assert!(top.typed());
        }

        #[test]
        fn members_must_belong_to_topology() {
            let mut other = Topology::new();
            let (_, stranger) = two_sites(&mut other);
            let mut top = Topology::new();
            let (a, b) = two_sites(&mut top);
            assert_eq!(stranger.key(), b.key());
            assert_eq!(
                top.add_connection(Bond::new([a, stranger]), true),
                Err(TopologyError::UnknownSite(stranger))
            );
            assert!(!top.contains(stranger));
            assert_eq!(top.n_connections(), 0);
        }

        #[test]
        fn duplicate_bonds_coalesce() {
            let mut top = Topology::new();
            let (a, b) = two_sites(&mut top);
            let first = top.add_connection(Bond::new([a, b]), true).unwrap();
            let second = top.add_connection(Bond::new([a, b]), true).unwrap();
            top.update_topology();
            assert_eq!(first, second);
            assert_eq!(top.n_connections(), 1);
        }

        #[test]
        fn bonds_with_different_types_are_kept() {
            let mut top = Topology::new();
            let (a, b) = two_sites(&mut top);
            let default = top.add_bond_type(BondType::default());
            let mut stiff = BondType::default();
            stiff
                .set_parameter("k", Quantity::with_unit(2000.0, "kJ/(mol*nm**2)").unwrap())
                .unwrap();
            let stiff = top.add_bond_type(stiff);
            top.add_connection(Bond::new([a, b]).with_type(default), true)
                .unwrap();
            top.add_connection(Bond::new([a, b]).with_type(stiff), true)
                .unwrap();
            assert_eq!(top.n_bonds(), 2);
            assert_eq!(top.bond_types().len(), 2);
        }

        #[test]
        fn every_kind_registers_its_type() {
            let mut top = Topology::new();
            let t1 = custom_atom_type(&mut top, "sigma + epsilon*r");
            let t2 = custom_atom_type(&mut top, "sigma * epsilon*r");
            let s: Vec<SiteId> = [t1, t2, t2, t1]
                .iter()
                .enumerate()
                .map(|(i, &t)| {
                    top.add_site(Site::new(format!("s{}", i)).with_atom_type(t), true)
                        .unwrap()
                })
                .collect();
            let bt = top.add_bond_type(BondType::default());
            let at = top.add_angle_type(AngleType::default());
            let dt = top.add_dihedral_type(DihedralType::default());
            let it = top.add_improper_type(ImproperType::default());
            top.add_connection(Bond::new([s[0], s[1]]).with_type(bt), true)
                .unwrap();
            top.add_connection(Angle::new([s[0], s[1], s[2]]).with_type(at), true)
                .unwrap();
            top.add_connection(
                Dihedral::new([s[0], s[1], s[2], s[3]]).with_type(dt),
                true,
            )
            .unwrap();
            top.add_connection(
                Improper::new([s[0], s[1], s[2], s[3]]).with_type(it),
                true,
            )
            .unwrap();

            assert_eq!(top.n_bonds(), 1);
            assert_eq!(top.n_angles(), 1);
            assert_eq!(top.n_dihedrals(), 1);
            assert_eq!(top.n_impropers(), 1);
            assert_eq!(top.n_connections(), 4);
            assert_eq!(top.bond_type_expressions().len(), 1);
            assert_eq!(top.angle_type_expressions().len(), 1);
            assert_eq!(top.dihedral_type_expressions().len(), 1);
            assert_eq!(top.improper_type_expressions().len(), 1);
            assert_eq!(top.atom_type_expressions().len(), 2);
            assert_eq!(top.connection_types().len(), 4);
            assert_eq!(top.connection_type_expressions().len(), 4);
        }
    }

    mod rescans {
        use super::*;

        #[test]
        fn update_atom_types_picks_up_retyped_sites() {
            let mut top = Topology::new();
            let shared = top.add_atom_type(AtomType::default());
            let a = top.add_site(Site::new("a").with_atom_type(shared), true).unwrap();
            let b = top.add_site(Site::new("b").with_atom_type(shared), true).unwrap();
            let bt = top.add_bond_type(BondType::default());
            top.add_connection(Bond::new([a, b]).with_type(bt), true)
                .unwrap();
            assert_eq!(top.atom_types().len(), 1);
            assert_eq!(top.connection_types().len(), 1);

            let other = custom_atom_type(&mut top, "sigma*epsilon*r");
            top.site_mut(a).unwrap().atom_type = Some(other);
            assert_eq!(top.atom_types().len(), 1);
            top.update_atom_types();
            assert_eq!(top.atom_types().len(), 2);
            assert_eq!(top.atom_type_expressions().len(), 2);
            assert_eq!(top.connection_types().len(), 1);
        }

        #[test]
        fn hundred_sites_over_ten_names() {
            let mut top = Topology::new();
            let mut sites = Vec::new();
            for i in 0..100 {
                let t = top.add_atom_type(AtomType::named(format!("atom_type{}", i % 10)));
                let site = Site::new(format!("site{}", i)).with_atom_type(t);
                sites.push(top.add_site(site, false).unwrap());
            }
            top.update_topology();
            assert_eq!(top.atom_types().len(), 10);

            let shared = top.site(sites[0]).unwrap().atom_type.unwrap();
            assert_eq!(top.site(sites[10]).unwrap().atom_type, Some(shared));
            top.edit_atom_type(shared, |t| t.set_name("atom_type_changed"))
                .unwrap();
            let via_tenth = top.site(sites[10]).unwrap().atom_type.unwrap();
            assert_eq!(top.atom_type(via_tenth).unwrap().name(), "atom_type_changed");
            assert!(top.is_typed());
        }

        #[test]
        fn stale_registry_hides_edited_type_until_rescan() {
            let mut top = Topology::new();
            let t = top.add_atom_type(AtomType::default());
            top.add_site(Site::new("a").with_atom_type(t), true).unwrap();
            top.atom_type_mut(t).unwrap().set_name("renamed");
            assert!(matches!(
                top.get_index(t),
                Err(TopologyError::MemberNotFound(_))
            ));
            top.update_atom_types();
            assert_eq!(top.get_index(t), Ok(0));
        }
    }

    mod indexing {
        use super::*;

        #[test]
        fn connection_indices_count_within_kind() {
            let mut top = Topology::new();
            let sites: Vec<SiteId> = (0..10)
                .map(|i| top.add_site(Site::new(format!("s{}", i)), true).unwrap())
                .collect();
            for i in 0..5 {
                top.add_connection(Bond::new([sites[i], sites[i + 1]]), true)
                    .unwrap();
                top.add_connection(Angle::new([sites[i], sites[i + 1], sites[i + 2]]), true)
                    .unwrap();
                let four = [sites[i], sites[i + 1], sites[i + 2], sites[i + 3]];
                top.add_connection(Dihedral::new(four), true).unwrap();
                top.add_connection(Improper::new(four), true).unwrap();
            }

            let extra = top.add_site(Site::new("extra"), true).unwrap();
            let bond = top.add_connection(Bond::new([sites[8], sites[9]]), true).unwrap();
            let angle = top
                .add_connection(Angle::new([sites[7], sites[8], sites[9]]), true)
                .unwrap();
            let four = [sites[6], sites[7], sites[8], sites[9]];
            let dihedral = top.add_connection(Dihedral::new(four), true).unwrap();
            let improper = top.add_connection(Improper::new(four), true).unwrap();

            assert_eq!(top.get_index(extra), Ok(10));
            assert_eq!(top.get_index(bond), Ok(5));
            assert_eq!(top.get_index(angle), Ok(5));
            assert_eq!(top.get_index(dihedral), Ok(5));
            assert_eq!(top.get_index(improper), Ok(5));
            assert_eq!(top.n_connections(), 24);
            assert_eq!(top.connections()[23], improper);
        }

        #[test]
        fn unsupported_members_are_rejected() {
            let mut top = Topology::new();
            let subtop = top.add_subtopology(SubTopology::new("mol")).unwrap();
            assert!(matches!(
                top.get_index(subtop),
                Err(TopologyError::UnsupportedMember("subtopology"))
            ));
            let t = top.add_atom_type(AtomType::default());
            assert!(matches!(
                top.get_index(TopologyMember::PairPotentialType([t, t])),
                Err(TopologyError::UnsupportedMember(_))
            ));
        }

        #[test]
        fn absent_site_is_not_found() {
            let mut other = Topology::new();
            let absent = other.add_site(Site::new("theirs"), true).unwrap();
            let mut top = Topology::new();
            let mine = top.add_site(Site::new("mine"), true).unwrap();
            assert_eq!(absent.key(), mine.key());
            assert!(matches!(
                top.get_index(absent),
                Err(TopologyError::MemberNotFound(_))
            ));
            assert!(!top.contains(absent));
            assert!(top.site(absent).is_none());
            assert_eq!(top.get_index(mine), Ok(0));
        }

        fn typed_water() -> (Topology, AtomTypeId, AtomTypeId) {
            let mut top = Topology::with_name("water");
            let o = top.add_atom_type(AtomType::named("opls_111"));
            let h = top.add_atom_type(AtomType::named("opls_112"));
            let ow = top.add_site(Site::new("OW").with_atom_type(o), false).unwrap();
            let hw1 = top.add_site(Site::new("HW1").with_atom_type(h), false).unwrap();
            let hw2 = top.add_site(Site::new("HW2").with_atom_type(h), false).unwrap();
            let bt = top.add_bond_type(BondType::default());
            top.add_connection(Bond::new([ow, hw1]).with_type(bt), false)
                .unwrap();
            top.add_connection(Bond::new([ow, hw2]).with_type(bt), false)
                .unwrap();
            top.update_topology();
            (top, o, h)
        }

        #[test]
        fn atom_type_indices_follow_first_occurrence() {
            let (top, o, h) = typed_water();
            assert_eq!(top.get_index(o), Ok(0));
            assert_eq!(top.get_index(h), Ok(1));
            assert_eq!(top.get_index(top.bond_type_ids()[0]), Ok(0));
        }

        #[test]
        fn renamed_atom_type_moves_behind_survivors() {
            let (mut top, o, h) = typed_water();
            top.edit_atom_type(o, |t| t.set_name("atom_type_changed_name"))
                .unwrap();
            assert_eq!(top.get_index(o), Ok(1));
            assert_eq!(top.get_index(h), Ok(0));
        }

        #[test]
        fn renamed_bond_type_changes_index() {
            let mut top = Topology::new();
            let s: Vec<SiteId> = (0..3)
                .map(|i| top.add_site(Site::new(format!("s{}", i)), true).unwrap())
                .collect();
            let first = top.add_bond_type(BondType::default());
            let mut other = BondType::default();
            other.set_name("CN");
            let second = top.add_bond_type(other);
            top.add_connection(Bond::new([s[0], s[1]]).with_type(first), true)
                .unwrap();
            top.add_connection(Bond::new([s[1], s[2]]).with_type(second), true)
                .unwrap();
            assert_eq!(top.get_index(first), Ok(0));
            top.edit_bond_type(first, |t| t.set_name("changed name"))
                .unwrap();
            assert_ne!(top.get_index(first), Ok(0));
        }
    }

    mod typed_flag {
        use super::*;

        #[test]
        fn adding_a_typed_site_sets_the_flag() {
            let mut top = Topology::new();
            assert!(!top.typed());
            let t = top.add_atom_type(AtomType::default());
            top.add_site(Site::new("a").with_atom_type(t), true).unwrap();
            assert!(top.typed());
            assert!(top.is_typed());
        }

        #[test]
        fn flag_and_computed_state_are_independent() {
            let mut top = Topology::new();
            assert!(!top.typed());
            assert!(!top.is_typed());
            top.set_typed(true);
            assert!(top.typed());
            assert!(!top.is_typed());
        }
    }

    mod pair_potentials {
        use super::*;

        fn offset_pair(members: [AtomTypeId; 2], offset: &str) -> PairPotentialType {
            let potential =
                Potential::new("pp12", &format!("r + {}", offset), BTreeMap::new(), ["r"])
                    .unwrap();
            PairPotentialType::new(potential, Some(members))
        }

        #[test]
        fn second_insertion_for_same_pair_replaces_first() {
            let mut top = Topology::new();
            let t1 = custom_atom_type(&mut top, "sigma + epsilon*r");
            let t1_twin = custom_atom_type(&mut top, "sigma + epsilon*r");
            let t2 = custom_atom_type(&mut top, "sigma * epsilon*r");
            top.add_site(Site::new("a").with_atom_type(t1), true).unwrap();
            top.add_site(Site::new("b").with_atom_type(t2), true).unwrap();
            top.update_topology();

            assert_eq!(top.add_pairpotentialtype(offset_pair([t1, t2], "1")), Ok(None));
            assert_eq!(top.pairpotential_types().len(), 1);
            let replaced = top
                .add_pairpotentialtype(offset_pair([t1_twin, t2], "2"))
                .unwrap();
            assert_eq!(replaced, Some(offset_pair([t1, t2], "1")));
            assert_eq!(top.pairpotential_types().len(), 1);
            assert_eq!(
                top.pairpotential_type(t2, t1).unwrap(),
                Some(&offset_pair([t1, t2], "2"))
            );
            assert!(top.contains(TopologyMember::PairPotentialType([t1, t2])));

            top.remove_pairpotentialtype([t1, t2]).unwrap();
            assert!(top.pairpotential_types().is_empty());
        }

        #[test]
        fn removing_an_absent_pair_is_a_no_op() {
            let mut top = Topology::new();
            let a = top.add_atom_type(AtomType::named("a"));
            let b = top.add_atom_type(AtomType::named("b"));
            assert_eq!(top.remove_pairpotentialtype([a, b]), Ok(None));

            top.add_pairpotentialtype(PairPotentialType::between(a, b))
                .unwrap();
            assert_eq!(
                top.remove_pairpotentialtype([b, a]),
                Ok(Some(PairPotentialType::between(a, b)))
            );
            assert_eq!(top.remove_pairpotentialtype([a, b]), Ok(None));
            assert!(top.pairpotential_types().is_empty());
        }

        #[test]
        fn removing_with_a_foreign_handle_is_an_error() {
            let mut other = Topology::new();
            let foreign = other.add_atom_type(AtomType::named("a"));
            let mut top = Topology::new();
            let a = top.add_atom_type(AtomType::named("a"));
            assert_eq!(
                top.remove_pairpotentialtype([a, foreign]),
                Err(TopologyError::UnknownType {
                    kind: PotentialKind::Atom
                })
            );
        }

        #[test]
        fn pair_potentials_survive_without_sites() {
            let mut top = Topology::new();
            let a = top.add_atom_type(AtomType::named("a"));
            let b = top.add_atom_type(AtomType::named("b"));
            top.add_pairpotentialtype(PairPotentialType::between(a, b))
                .unwrap();
            top.update_topology();
            assert_eq!(top.pairpotential_types().len(), 1);
        }
    }

    mod subtopologies {
        use super::*;

        #[test]
        fn subtopology_membership_is_validated() {
            let mut top = Topology::new();
            let a = top.add_site(Site::new("a"), true).unwrap();
            let mol = top
                .add_subtopology(SubTopology::with_sites("mol", vec![a]))
                .unwrap();
            assert_eq!(top.n_subtops(), 1);

            let b = top.add_site(Site::new("b"), true).unwrap();
            assert_eq!(top.add_site_to_subtopology(mol, b), Ok(true));
            assert_eq!(top.add_site_to_subtopology(mol, b), Ok(false));
            assert_eq!(top.subtopology(mol).unwrap().sites(), &[a, b]);

            let mut other = Topology::new();
            other.add_site(Site::new("x"), true).unwrap();
            let stranger = other.add_site(Site::new("y"), true).unwrap();
            assert_eq!(stranger.key(), b.key());
            assert_eq!(
                top.add_subtopology(SubTopology::with_sites("bad", vec![stranger])),
                Err(TopologyError::UnknownSite(stranger))
            );
            assert_eq!(
                top.add_site_to_subtopology(mol, stranger),
                Err(TopologyError::UnknownSite(stranger))
            );
            let foreign_mol = other.add_subtopology(SubTopology::new("theirs")).unwrap();
            assert_eq!(foreign_mol.key(), mol.key());
            assert!(!top.contains(foreign_mol));
            assert_eq!(
                top.add_site_to_subtopology(foreign_mol, a),
                Err(TopologyError::UnknownSubTopology(foreign_mol))
            );
            assert!(top.contains(mol));
        }
    }

    mod ownership {
        use super::*;

        /// Two topologies built identically, so every handle of one has a
        /// slot-index twin in the other.
        fn twins() -> (Topology, Topology) {
            let build = || {
                let mut top = Topology::new();
                let t = top.add_atom_type(AtomType::default());
                let a = top.add_site(Site::new("a").with_atom_type(t), true).unwrap();
                let b = top.add_site(Site::new("b").with_atom_type(t), true).unwrap();
                let bt = top.add_bond_type(BondType::default());
                top.add_connection(Bond::new([a, b]).with_type(bt), true)
                    .unwrap();
                top
            };
            (build(), build())
        }

        #[test]
        fn handles_with_matching_slots_do_not_cross_topologies() {
            let (top, other) = twins();
            let (site, _) = other.sites().next().unwrap();
            let (bond, _) = other.bonds().next().unwrap();
            let atom_type = other.atom_type_ids()[0];
            let bond_type = other.bond_type_ids()[0];

            assert!(top.sites().any(|(id, _)| id.key() == site.key()));
            assert!(!top.contains(site));
            assert!(!top.contains(bond));
            assert!(!top.contains(atom_type));
            assert!(!top.contains(bond_type));
            assert!(top.site(site).is_none());
            assert!(top.bond(bond).is_none());
            assert!(top.atom_type(atom_type).is_none());
            for member in [
                TopologyMember::from(site),
                TopologyMember::from(bond),
                TopologyMember::from(atom_type),
                TopologyMember::from(bond_type),
            ] {
                assert!(matches!(
                    top.get_index(member),
                    Err(TopologyError::MemberNotFound(_))
                ));
            }
        }

        #[test]
        fn foreign_handles_are_rejected_by_mutators() {
            let (mut top, other) = twins();
            let (foreign_site, _) = other.sites().next().unwrap();
            let foreign_type = other.atom_type_ids()[0];
            let foreign_bond_type = other.bond_type_ids()[0];
            let (a, _) = top.sites().next().unwrap();

            assert!(top.site_mut(foreign_site).is_none());
            assert!(top.atom_type_mut(foreign_type).is_none());
            assert_eq!(
                top.edit_atom_type(foreign_type, |t| t.set_name("x")),
                Err(TopologyError::UnknownType {
                    kind: PotentialKind::Atom
                })
            );
            assert_eq!(
                top.add_connection(Bond::new([a, foreign_site]), true),
                Err(TopologyError::UnknownSite(foreign_site))
            );
            let (b, _) = top.sites().nth(1).unwrap();
            assert_eq!(
                top.add_connection(Bond::new([b, a]).with_type(foreign_bond_type), true),
                Err(TopologyError::UnknownType {
                    kind: PotentialKind::Bond
                })
            );
            assert_eq!(top.n_connections(), 1);
        }

        #[test]
        fn clones_resolve_handles_issued_before_cloning() {
            let (top, _) = twins();
            let copy = top.clone();
            for (id, site) in top.sites() {
                assert_eq!(copy.site(id).map(|s| s.name.as_str()), Some(site.name.as_str()));
            }
            assert_eq!(copy.get_index(top.atom_type_ids()[0]), Ok(0));
        }
    }
}
