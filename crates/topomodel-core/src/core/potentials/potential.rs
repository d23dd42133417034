use crate::core::expression::{Expression, ExpressionError};
use crate::core::units::quantity::Quantity;
use crate::core::units::unit::UnitError;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PotentialError {
    #[error("Invalid expression: {0}")]
    Expression(#[from] ExpressionError),
    #[error("Invalid parameter unit: {0}")]
    Unit(#[from] UnitError),
    #[error(
        "Parameters do not match the expression: missing {missing:?}, unexpected {unexpected:?}"
    )]
    ParameterMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },
    #[error("Independent variable '{0}' does not appear in the expression")]
    UnusedVariable(String),
    #[error("Unknown parameter '{0}'")]
    UnknownParameter(String),
}

/// A functional form with its parameter values.
///
/// The free symbols of `expression` split into the independent variables
/// (supplied at evaluation time) and the parameters (fixed here, with units).
/// That split is checked on every construction and mutation, so a
/// `Potential` is never observable in an inconsistent state.
///
/// Equality compares expression, parameters, and independent variables. The
/// name is a label only.
#[derive(Debug, Clone)]
pub struct Potential {
    name: String,
    expression: Expression,
    parameters: BTreeMap<String, Quantity>,
    independent_variables: BTreeSet<String>,
}

impl Potential {
    /// Parses `expression` and validates it against the parameters.
    ///
    /// # Errors
    ///
    /// Returns [`PotentialError`] if the expression does not parse or its free
    /// symbols are not exactly `parameters ∪ independent_variables`.
    pub fn new<I, S>(
        name: impl Into<String>,
        expression: &str,
        parameters: BTreeMap<String, Quantity>,
        independent_variables: I,
    ) -> Result<Self, PotentialError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_expression(
            name,
            Expression::parse(expression)?,
            parameters,
            independent_variables.into_iter().map(Into::into).collect(),
        )
    }

    pub fn from_expression(
        name: impl Into<String>,
        expression: Expression,
        parameters: BTreeMap<String, Quantity>,
        independent_variables: BTreeSet<String>,
    ) -> Result<Self, PotentialError> {
        validate(&expression, &parameters, &independent_variables)?;
        Ok(Self {
            name: name.into(),
            expression,
            parameters,
            independent_variables,
        })
    }

    /// Builds one of the built-in default potentials from literal parameter
    /// specs `(name, value, unit)`.
    ///
    /// Only the `Default` impls of the potential kinds call this, always with
    /// string and number literals. Each of those defaults is constructed in
    /// the `builtin_defaults` tests, so a typo there fails the test suite.
    pub(crate) fn builtin(
        name: &str,
        expression: &str,
        parameters: &[(&str, f64, &str)],
        independent_variables: &[&str],
    ) -> Self {
        Self::from_literals(name, expression, parameters, independent_variables)
            .expect("built-in potentials are self-consistent")
    }

    fn from_literals(
        name: &str,
        expression: &str,
        parameters: &[(&str, f64, &str)],
        independent_variables: &[&str],
    ) -> Result<Self, PotentialError> {
        let parameters = parameters
            .iter()
            .map(|(symbol, value, unit)| Ok((symbol.to_string(), Quantity::with_unit(*value, unit)?)))
            .collect::<Result<BTreeMap<_, _>, PotentialError>>()?;
        Self::new(
            name,
            expression,
            parameters,
            independent_variables.iter().copied(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn parameters(&self) -> &BTreeMap<String, Quantity> {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&Quantity> {
        self.parameters.get(name)
    }

    pub fn independent_variables(&self) -> &BTreeSet<String> {
        &self.independent_variables
    }

    /// Replaces the expression, keeping parameters and variables.
    pub fn set_expression(&mut self, expression: &str) -> Result<(), PotentialError> {
        self.update(Some(Expression::parse(expression)?), None, None)
    }

    /// Replaces the whole parameter map.
    pub fn set_parameters(
        &mut self,
        parameters: BTreeMap<String, Quantity>,
    ) -> Result<(), PotentialError> {
        self.update(None, Some(parameters), None)
    }

    /// Changes the value of one existing parameter.
    pub fn set_parameter(&mut self, name: &str, value: Quantity) -> Result<(), PotentialError> {
        match self.parameters.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(PotentialError::UnknownParameter(name.to_string())),
        }
    }

    /// Replaces any combination of expression, parameters, and independent
    /// variables at once.
    ///
    /// The candidate state is validated as a whole before anything is
    /// committed; on error `self` is left untouched. This is the only way to
    /// change the expression and its parameter set together.
    pub fn update(
        &mut self,
        expression: Option<Expression>,
        parameters: Option<BTreeMap<String, Quantity>>,
        independent_variables: Option<BTreeSet<String>>,
    ) -> Result<(), PotentialError> {
        let expression = expression.unwrap_or_else(|| self.expression.clone());
        let parameters = parameters.unwrap_or_else(|| self.parameters.clone());
        let independent_variables =
            independent_variables.unwrap_or_else(|| self.independent_variables.clone());
        validate(&expression, &parameters, &independent_variables)?;
        self.expression = expression;
        self.parameters = parameters;
        self.independent_variables = independent_variables;
        Ok(())
    }

    /// Evaluates the potential at the given independent-variable values.
    ///
    /// Parameters enter as SI magnitudes, so `variables` must be in SI units
    /// as well (metres, radians).
    pub fn evaluate(&self, variables: &HashMap<&str, f64>) -> Result<f64, PotentialError> {
        let mut bindings: HashMap<&str, f64> = self
            .parameters
            .iter()
            .map(|(name, q)| (name.as_str(), q.si_value()))
            .collect();
        for (name, value) in variables {
            bindings.insert(*name, *value);
        }
        Ok(self.expression.evaluate(&bindings)?)
    }
}

impl PartialEq for Potential {
    fn eq(&self, other: &Self) -> bool {
        self.expression == other.expression
            && self.independent_variables == other.independent_variables
            && self.parameters == other.parameters
    }
}

fn validate(
    expression: &Expression,
    parameters: &BTreeMap<String, Quantity>,
    independent_variables: &BTreeSet<String>,
) -> Result<(), PotentialError> {
    let symbols = expression.free_symbols();
    if let Some(unused) = independent_variables.difference(&symbols).next() {
        return Err(PotentialError::UnusedVariable(unused.clone()));
    }
    let expected: BTreeSet<&String> = symbols.difference(independent_variables).collect();
    let given: BTreeSet<&String> = parameters.keys().collect();
    if expected != given {
        return Err(PotentialError::ParameterMismatch {
            missing: expected.difference(&given).map(|s| s.to_string()).collect(),
            unexpected: given.difference(&expected).map(|s| s.to_string()).collect(),
        });
    }
    Ok(())
}
