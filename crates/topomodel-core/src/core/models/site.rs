use super::ids::AtomTypeId;
use crate::core::element::Element;
use crate::core::units::quantity::Quantity;
use crate::core::units::unit::Unit;
use nalgebra::Point3;

/// A point particle of a topology.
///
/// Charge and mass are optional overrides; when absent, consumers fall back
/// to the values on the site's atom type. The atom type is held as a handle
/// into the owning topology's pool, so many sites can share one type.
#[derive(Debug, Clone)]
pub struct Site {
    /// The display name of the site (e.g., "OW", "HW1").
    pub name: String,
    /// Cartesian position.
    pub position: Quantity<Point3<f64>>,
    pub charge: Option<Quantity>,
    pub mass: Option<Quantity>,
    pub element: Option<&'static Element>,
    pub atom_type: Option<AtomTypeId>,
}

impl Site {
    /// Creates an untyped site at the origin.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: Quantity::new(Point3::origin(), Unit::nanometer()),
            charge: None,
            mass: None,
            element: None,
            atom_type: None,
        }
    }

    /// Sets the position, in nanometres.
    pub fn at(mut self, position: Point3<f64>) -> Self {
        self.position = Quantity::new(position, Unit::nanometer());
        self
    }

    pub fn with_atom_type(mut self, atom_type: AtomTypeId) -> Self {
        self.atom_type = Some(atom_type);
        self
    }

    pub fn with_element(mut self, element: &'static Element) -> Self {
        self.element = Some(element);
        self
    }

    pub fn with_charge(mut self, charge: Quantity) -> Self {
        self.charge = Some(charge);
        self
    }

    pub fn with_mass(mut self, mass: Quantity) -> Self {
        self.mass = Some(mass);
        self
    }

    pub fn is_typed(&self) -> bool {
        self.atom_type.is_some()
    }
}

impl Default for Site {
    fn default() -> Self {
        Self::new("")
    }
}
