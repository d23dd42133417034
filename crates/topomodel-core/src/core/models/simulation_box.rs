use crate::core::units::quantity::Quantity;
use crate::core::units::unit::{Dimension, Unit, UnitError};
use nalgebra::{Matrix3, Vector3};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BoxError {
    #[error("Box lengths must be positive, got {0:?}")]
    NonPositiveLength([f64; 3]),
    #[error("Box angles must lie strictly between 0 and 180 degrees, got {0:?}")]
    AngleOutOfRange([f64; 3]),
    #[error("Box angles {0:?} do not describe a valid triclinic cell")]
    Degenerate([f64; 3]),
    #[error("Expected {expected} units for box {what}, got '{unit}'")]
    WrongDimension {
        what: &'static str,
        expected: &'static str,
        unit: String,
    },
    #[error(transparent)]
    Unit(#[from] UnitError),
}

/// A periodic simulation cell described by three edge lengths and the three
/// angles between them (alpha between b and c, beta between a and c, gamma
/// between a and b).
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationBox {
    lengths: Quantity<Vector3<f64>>,
    angles: Quantity<Vector3<f64>>,
}

impl SimulationBox {
    /// Creates a box, validating lengths and angles.
    ///
    /// # Errors
    ///
    /// Returns [`BoxError`] if a length is not positive, an angle lies outside
    /// (0°, 180°), the angles cannot close a cell, or the quantities carry the
    /// wrong dimensions.
    pub fn new(
        lengths: Quantity<Vector3<f64>>,
        angles: Quantity<Vector3<f64>>,
    ) -> Result<Self, BoxError> {
        if lengths.unit().dimension() != Dimension::LENGTH {
            return Err(BoxError::WrongDimension {
                what: "lengths",
                expected: "length",
                unit: lengths.unit().symbol().to_string(),
            });
        }
        if angles.unit().dimension() != Dimension::ANGLE {
            return Err(BoxError::WrongDimension {
                what: "angles",
                expected: "angle",
                unit: angles.unit().symbol().to_string(),
            });
        }
        let l = lengths.value();
        if l.iter().any(|&x| x <= 0.0 || !x.is_finite()) {
            return Err(BoxError::NonPositiveLength([l.x, l.y, l.z]));
        }
        let degrees = *angles.to(&Unit::degree())?.value();
        if degrees.iter().any(|&a| a <= 0.0 || a >= 180.0 || !a.is_finite()) {
            return Err(BoxError::AngleOutOfRange([degrees.x, degrees.y, degrees.z]));
        }
        let candidate = Self { lengths, angles };
        let (_, cy, cz_squared) = candidate.third_vector_components();
        if cz_squared <= 0.0 || !cy.is_finite() {
            return Err(BoxError::Degenerate([degrees.x, degrees.y, degrees.z]));
        }
        Ok(candidate)
    }

    /// A rectangular box with edge lengths in nanometres.
    pub fn orthorhombic(a: f64, b: f64, c: f64) -> Result<Self, BoxError> {
        Self::new(
            Quantity::new(Vector3::new(a, b, c), Unit::nanometer()),
            Quantity::new(Vector3::new(90.0, 90.0, 90.0), Unit::degree()),
        )
    }

    pub fn cubic(edge: f64) -> Result<Self, BoxError> {
        Self::orthorhombic(edge, edge, edge)
    }

    pub fn lengths(&self) -> &Quantity<Vector3<f64>> {
        &self.lengths
    }

    pub fn angles(&self) -> &Quantity<Vector3<f64>> {
        &self.angles
    }

    fn radians(&self) -> Vector3<f64> {
        self.angles.si_value()
    }

    /// Returns (c_x, c_y, c_z²) for a unit-length third vector.
    fn third_vector_components(&self) -> (f64, f64, f64) {
        let r = self.radians();
        let (alpha, beta, gamma) = (r.x, r.y, r.z);
        let cx = beta.cos();
        let cy = (alpha.cos() - beta.cos() * gamma.cos()) / gamma.sin();
        (cx, cy, 1.0 - cx * cx - cy * cy)
    }

    /// Unit lattice vectors as matrix rows, with `a` along x and `b` in the
    /// xy-plane.
    pub fn unit_vectors(&self) -> Matrix3<f64> {
        let gamma = self.radians().z;
        let (cx, cy, cz_squared) = self.third_vector_components();
        Matrix3::new(
            1.0,
            0.0,
            0.0,
            gamma.cos(),
            gamma.sin(),
            0.0,
            cx,
            cy,
            cz_squared.max(0.0).sqrt(),
        )
    }

    /// Lattice vectors as matrix rows, in nanometres.
    pub fn vectors(&self) -> Matrix3<f64> {
        let nm = self
            .lengths
            .to(&Unit::nanometer())
            .map(|q| *q.value())
            .unwrap_or_else(|_| self.lengths.si_value() * 1e9);
        let mut vectors = self.unit_vectors();
        for (i, length) in nm.iter().enumerate() {
            let mut row = vectors.row_mut(i);
            row *= *length;
        }
        vectors
    }

    /// Cell volume in nm³.
    pub fn volume(&self) -> f64 {
        self.vectors().determinant().abs()
    }
}
