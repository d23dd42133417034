use super::unit::{Unit, UnitError, approx_eq};
use nalgebra::{Point3, Vector3};
use std::fmt;
use std::str::FromStr;

/// Numeric payloads a [`Quantity`] can carry: scalars and fixed-size vectors.
pub trait Magnitude: Clone + fmt::Debug {
    fn scaled(&self, factor: f64) -> Self;
    fn approx_eq(&self, other: &Self) -> bool;
}

impl Magnitude for f64 {
    fn scaled(&self, factor: f64) -> Self {
        self * factor
    }

    fn approx_eq(&self, other: &Self) -> bool {
        approx_eq(*self, *other)
    }
}

impl Magnitude for Vector3<f64> {
    fn scaled(&self, factor: f64) -> Self {
        self * factor
    }

    fn approx_eq(&self, other: &Self) -> bool {
        self.iter().zip(other.iter()).all(|(a, b)| approx_eq(*a, *b))
    }
}

impl Magnitude for Point3<f64> {
    fn scaled(&self, factor: f64) -> Self {
        Point3::from(self.coords * factor)
    }

    fn approx_eq(&self, other: &Self) -> bool {
        self.coords.approx_eq(&other.coords)
    }
}

/// A value tagged with a physical unit.
///
/// Quantities compare equal when their dimensions match and their magnitudes
/// agree once expressed in SI units, so `1 nm == 10 angstrom`.
#[derive(Debug, Clone)]
pub struct Quantity<T: Magnitude = f64> {
    value: T,
    unit: Unit,
}

impl<T: Magnitude> Quantity<T> {
    pub fn new(value: T, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// Builds a quantity from a unit string such as `"kJ/mol"`.
    pub fn with_unit(value: T, unit: &str) -> Result<Self, UnitError> {
        Ok(Self::new(value, Unit::parse(unit)?))
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    /// Converts to a compatible unit.
    ///
    /// # Errors
    ///
    /// Returns [`UnitError::Incompatible`] when the dimensions differ.
    pub fn to(&self, unit: &Unit) -> Result<Quantity<T>, UnitError> {
        let factor = self.unit.conversion_factor(unit)?;
        Ok(Quantity::new(self.value.scaled(factor), unit.clone()))
    }

    /// The magnitude expressed in SI base units.
    pub fn si_value(&self) -> T {
        self.value.scaled(self.unit.scale())
    }
}

impl<T: Magnitude> PartialEq for Quantity<T> {
    fn eq(&self, other: &Self) -> bool {
        self.unit.is_compatible(&other.unit) && self.si_value().approx_eq(&other.si_value())
    }
}

impl fmt::Display for Quantity<f64> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

impl FromStr for Quantity<f64> {
    type Err = UnitError;

    /// Parses `"<number> <unit>"`; a bare number is dimensionless.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let split = trimmed
            .find(char::is_whitespace)
            .unwrap_or(trimmed.len());
        let (number, unit) = trimmed.split_at(split);
        let value = number
            .parse::<f64>()
            .map_err(|_| UnitError::MalformedQuantity(s.to_string()))?;
        Quantity::with_unit(value, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_scales_value() {
        let q = Quantity::new(1.5, Unit::nanometer());
        let converted = q.to(&Unit::angstrom()).unwrap();
        assert!((converted.value() - 15.0).abs() < 1e-12);
        assert_eq!(converted.unit().symbol(), "angstrom");
    }

    #[test]
    fn conversion_to_incompatible_unit_fails() {
        let q = Quantity::new(1.0, Unit::nanometer());
        assert!(matches!(
            q.to(&Unit::kilojoule_per_mole()),
            Err(UnitError::Incompatible { .. })
        ));
    }

    #[test]
    fn equality_is_unit_aware() {
        let a = Quantity::new(1.0, Unit::nanometer());
        let b = Quantity::new(10.0, Unit::angstrom());
        let c = Quantity::new(1.0, Unit::angstrom());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn equality_requires_matching_dimensions() {
        let a = Quantity::new(1.0, Unit::dimensionless());
        let b = Quantity::new(1.0, Unit::radian());
        assert_ne!(a, b);
    }

    #[test]
    fn kcal_and_kj_compare_after_conversion() {
        let kcal = Quantity::new(1.0, Unit::kilocalorie_per_mole());
        let kj = Quantity::new(4.184, Unit::kilojoule_per_mole());
        assert_eq!(kcal, kj);
    }

    #[test]
    fn vector_quantities_convert_componentwise() {
        let q = Quantity::new(Point3::new(1.0, 2.0, 3.0), Unit::nanometer());
        let converted = q.to(&Unit::angstrom()).unwrap();
        assert!((converted.value() - Point3::new(10.0, 20.0, 30.0)).norm() < 1e-9);
        assert_eq!(q, converted);
    }

    #[test]
    fn parses_value_and_unit_from_string() {
        let q: Quantity = "0.315061 nm".parse().unwrap();
        assert_eq!(*q.value(), 0.315061);
        assert_eq!(*q.unit(), Unit::nanometer());

        let energy: Quantity = "502416.0 kJ/(mol*nm**2)".parse().unwrap();
        assert_eq!(
            *energy.unit(),
            Unit::kilojoule_per_mole_per(&Unit::nanometer()).unwrap()
        );
    }

    #[test]
    fn bare_number_parses_as_dimensionless() {
        let q: Quantity = "3".parse().unwrap();
        assert!(q.unit().dimension().is_dimensionless());
    }

    #[test]
    fn overflowing_unit_exponents_are_rejected() {
        assert!(matches!(
            Quantity::with_unit(1.0, "(nm**100)**2"),
            Err(UnitError::Malformed { .. })
        ));
        assert!(matches!(
            "1.0 nm**100*nm**100".parse::<Quantity>(),
            Err(UnitError::Malformed { .. })
        ));
    }

    #[test]
    fn malformed_quantity_strings_are_rejected() {
        assert!(matches!(
            "abc nm".parse::<Quantity>(),
            Err(UnitError::MalformedQuantity(_))
        ));
        assert!(matches!(
            "1.0 parsecs".parse::<Quantity>(),
            Err(UnitError::UnknownSymbol(_))
        ));
    }

    #[test]
    fn display_shows_value_and_symbol() {
        let q = Quantity::new(0.3, Unit::nanometer());
        assert_eq!(q.to_string(), "0.3 nm");
    }
}
