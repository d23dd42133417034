use phf::{Map, phf_map};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const LENGTH: usize = 0;
const MASS: usize = 1;
const TIME: usize = 2;
const CHARGE: usize = 3;
const TEMPERATURE: usize = 4;
const AMOUNT: usize = 5;
const ANGLE: usize = 6;

const AMU_IN_KG: f64 = 1.660_539_066_60e-27;
const ELEMENTARY_CHARGE_IN_C: f64 = 1.602_176_634e-19;

/// Exponents of the base dimensions a unit is built from.
///
/// The slots are, in order: length, mass, time, charge, temperature,
/// amount of substance, and plane angle. Angles are tracked as their own
/// dimension so that `rad` and `degree` never silently convert to a bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dimension([i8; 7]);

impl Dimension {
    pub const NONE: Dimension = Dimension([0; 7]);
    pub const LENGTH: Dimension = Dimension([1, 0, 0, 0, 0, 0, 0]);
    pub const MASS: Dimension = Dimension([0, 1, 0, 0, 0, 0, 0]);
    pub const CHARGE: Dimension = Dimension([0, 0, 0, 1, 0, 0, 0]);
    pub const ANGLE: Dimension = Dimension([0, 0, 0, 0, 0, 0, 1]);
    pub const ENERGY: Dimension = Dimension([2, 1, -2, 0, 0, 0, 0]);
    pub const MOLAR_ENERGY: Dimension = Dimension([2, 1, -2, 0, 0, -1, 0]);

    /// `self * other` for `sign == 1`, `self / other` for `sign == -1`.
    /// `None` if an exponent leaves the `i8` range.
    fn combine(self, other: Dimension, sign: i8) -> Option<Dimension> {
        let mut exps = self.0;
        for (e, o) in exps.iter_mut().zip(other.0) {
            *e = e.checked_add(sign.checked_mul(o)?)?;
        }
        Some(Dimension(exps))
    }

    fn powi(self, n: i8) -> Option<Dimension> {
        let mut exps = self.0;
        for e in exps.iter_mut() {
            *e = e.checked_mul(n)?;
        }
        Some(Dimension(exps))
    }

    pub fn is_dimensionless(&self) -> bool {
        *self == Self::NONE
    }
}

#[derive(Debug, Clone, Copy)]
struct BaseUnit {
    scale: f64,
    dims: [i8; 7],
}

const fn base(scale: f64, dim: usize, exp: i8) -> BaseUnit {
    let mut dims = [0i8; 7];
    dims[dim] = exp;
    BaseUnit { scale, dims }
}

const fn energy(scale: f64) -> BaseUnit {
    BaseUnit {
        scale,
        dims: [2, 1, -2, 0, 0, 0, 0],
    }
}

static BASE_UNITS: Map<&'static str, BaseUnit> = phf_map! {
    "dimensionless" => BaseUnit { scale: 1.0, dims: [0; 7] },
    "m" => base(1.0, LENGTH, 1),
    "cm" => base(1e-2, LENGTH, 1),
    "nm" => base(1e-9, LENGTH, 1),
    "pm" => base(1e-12, LENGTH, 1),
    "angstrom" => base(1e-10, LENGTH, 1),
    "Å" => base(1e-10, LENGTH, 1),
    "kg" => base(1.0, MASS, 1),
    "g" => base(1e-3, MASS, 1),
    "amu" => base(AMU_IN_KG, MASS, 1),
    "Da" => base(AMU_IN_KG, MASS, 1),
    "s" => base(1.0, TIME, 1),
    "ns" => base(1e-9, TIME, 1),
    "ps" => base(1e-12, TIME, 1),
    "fs" => base(1e-15, TIME, 1),
    "C" => base(1.0, CHARGE, 1),
    "e" => base(ELEMENTARY_CHARGE_IN_C, CHARGE, 1),
    "elementary_charge" => base(ELEMENTARY_CHARGE_IN_C, CHARGE, 1),
    "K" => base(1.0, TEMPERATURE, 1),
    "mol" => base(1.0, AMOUNT, 1),
    "rad" => base(1.0, ANGLE, 1),
    "radian" => base(1.0, ANGLE, 1),
    "deg" => base(PI / 180.0, ANGLE, 1),
    "degree" => base(PI / 180.0, ANGLE, 1),
    "J" => energy(1.0),
    "kJ" => energy(1e3),
    "cal" => energy(4.184),
    "kcal" => energy(4184.0),
};

const EXPONENT_OUT_OF_RANGE: &str = "exponent out of range";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UnitError {
    #[error("Unknown unit symbol '{0}'")]
    UnknownSymbol(String),
    #[error("Malformed unit expression '{unit}': {reason}")]
    Malformed { unit: String, reason: String },
    #[error("Cannot convert from '{from}' to '{to}': incompatible dimensions")]
    Incompatible { from: String, to: String },
    #[error("Malformed quantity '{0}'")]
    MalformedQuantity(String),
}

/// A physical unit: a display symbol, its dimension, and its scale relative to SI.
///
/// Two units are equal when they describe the same dimension with the same
/// scale, regardless of how the symbol was spelled (`"kJ/mol"` equals
/// `"kJ / mol"`).
#[derive(Debug, Clone)]
pub struct Unit {
    symbol: String,
    dimension: Dimension,
    scale: f64,
}

impl Unit {
    fn known(symbol: &str, scale: f64, dimension: Dimension) -> Self {
        Self {
            symbol: symbol.to_string(),
            dimension,
            scale,
        }
    }

    pub fn parse(text: &str) -> Result<Self, UnitError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Self::dimensionless());
        }
        let mut parser = UnitParser::new(trimmed);
        let (scale, dimension) = parser.parse_product()?;
        if parser.pos < parser.tokens.len() {
            return Err(parser.malformed("unexpected trailing input"));
        }
        Ok(Self {
            symbol: trimmed.to_string(),
            dimension,
            scale,
        })
    }

    pub fn dimensionless() -> Self {
        Self::known("dimensionless", 1.0, Dimension::NONE)
    }

    pub fn nanometer() -> Self {
        Self::known("nm", 1e-9, Dimension::LENGTH)
    }

    pub fn angstrom() -> Self {
        Self::known("angstrom", 1e-10, Dimension::LENGTH)
    }

    pub fn amu() -> Self {
        Self::known("amu", AMU_IN_KG, Dimension::MASS)
    }

    pub fn elementary_charge() -> Self {
        Self::known("elementary_charge", ELEMENTARY_CHARGE_IN_C, Dimension::CHARGE)
    }

    pub fn radian() -> Self {
        Self::known("rad", 1.0, Dimension::ANGLE)
    }

    pub fn degree() -> Self {
        Self::known("degree", PI / 180.0, Dimension::ANGLE)
    }

    pub fn kilojoule_per_mole() -> Self {
        Self::known("kJ/mol", 1e3, Dimension::MOLAR_ENERGY)
    }

    pub fn kilocalorie_per_mole() -> Self {
        Self::known("kcal/mol", 4184.0, Dimension::MOLAR_ENERGY)
    }

    /// `kJ/mol` divided by `unit` squared, the usual unit of a harmonic force constant.
    ///
    /// # Errors
    ///
    /// Returns [`UnitError::Malformed`] if the resulting exponents overflow.
    pub fn kilojoule_per_mole_per(unit: &Unit) -> Result<Self, UnitError> {
        let symbol = format!("kJ/(mol*{}**2)", unit.symbol);
        let per = unit.powi(2);
        let dimension = per
            .and_then(|per| Dimension::MOLAR_ENERGY.combine(per.dimension, -1))
            .ok_or_else(|| UnitError::Malformed {
                unit: symbol.clone(),
                reason: EXPONENT_OUT_OF_RANGE.to_string(),
            })?;
        Ok(Self {
            symbol,
            dimension,
            scale: 1e3 / unit.scale.powi(2),
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// Multiplier converting a magnitude in this unit to SI base units.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn is_compatible(&self, other: &Unit) -> bool {
        self.dimension == other.dimension
    }

    /// Factor that converts a magnitude in `self` into a magnitude in `target`.
    pub fn conversion_factor(&self, target: &Unit) -> Result<f64, UnitError> {
        if !self.is_compatible(target) {
            return Err(UnitError::Incompatible {
                from: self.symbol.clone(),
                to: target.symbol.clone(),
            });
        }
        Ok(self.scale / target.scale)
    }

    fn powi(&self, n: i8) -> Option<Unit> {
        Some(Unit {
            symbol: format!("{}**{}", self.symbol, n),
            dimension: self.dimension.powi(n)?,
            scale: self.scale.powi(n as i32),
        })
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.dimension == other.dimension && approx_eq(self.scale, other.scale)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

impl FromStr for Unit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Unit::parse(s)
    }
}

pub(crate) fn approx_eq(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    let diff = (a - b).abs();
    diff <= 1e-12 * a.abs().max(b.abs())
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Symbol(String),
    Integer(i8),
    Times,
    Divide,
    Power,
    Minus,
    Open,
    Close,
}

struct UnitParser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    error: Option<UnitError>,
}

impl<'a> UnitParser<'a> {
    fn new(source: &'a str) -> Self {
        let mut parser = Self {
            source,
            tokens: Vec::new(),
            pos: 0,
            error: None,
        };
        parser.tokenize();
        parser
    }

    fn malformed(&self, reason: &str) -> UnitError {
        UnitError::Malformed {
            unit: self.source.to_string(),
            reason: reason.to_string(),
        }
    }

    fn tokenize(&mut self) {
        let chars: Vec<char> = self.source.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            match c {
                ' ' | '\t' => i += 1,
                '*' if chars.get(i + 1) == Some(&'*') => {
                    self.tokens.push(Token::Power);
                    i += 2;
                }
                '*' | '·' => {
                    self.tokens.push(Token::Times);
                    i += 1;
                }
                '^' => {
                    self.tokens.push(Token::Power);
                    i += 1;
                }
                '/' => {
                    self.tokens.push(Token::Divide);
                    i += 1;
                }
                '-' => {
                    self.tokens.push(Token::Minus);
                    i += 1;
                }
                '(' => {
                    self.tokens.push(Token::Open);
                    i += 1;
                }
                ')' => {
                    self.tokens.push(Token::Close);
                    i += 1;
                }
                c if c.is_ascii_digit() => {
                    let start = i;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                    let digits: String = chars[start..i].iter().collect();
                    match digits.parse::<i8>() {
                        Ok(n) => self.tokens.push(Token::Integer(n)),
                        Err(_) => {
                            self.error = Some(self.malformed(EXPONENT_OUT_OF_RANGE));
                            return;
                        }
                    }
                }
                c if c.is_alphabetic() || c == '_' => {
                    let start = i;
                    while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                        i += 1;
                    }
                    self.tokens
                        .push(Token::Symbol(chars[start..i].iter().collect()));
                }
                _ => {
                    self.error = Some(self.malformed(&format!("unexpected character '{}'", c)));
                    return;
                }
            }
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn parse_product(&mut self) -> Result<(f64, Dimension), UnitError> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        let (mut scale, mut dims) = self.parse_factor()?;
        loop {
            let sign = match self.peek() {
                Some(Token::Times) => 1,
                Some(Token::Divide) => -1,
                _ => break,
            };
            self.pos += 1;
            let (s, d) = self.parse_factor()?;
            if sign > 0 {
                scale *= s;
            } else {
                scale /= s;
            }
            dims = dims
                .combine(d, sign)
                .ok_or_else(|| self.malformed(EXPONENT_OUT_OF_RANGE))?;
        }
        Ok((scale, dims))
    }

    fn parse_factor(&mut self) -> Result<(f64, Dimension), UnitError> {
        let (scale, dims) = match self.next() {
            Some(Token::Symbol(name)) => {
                let unit = BASE_UNITS
                    .get(name.as_str())
                    .ok_or(UnitError::UnknownSymbol(name))?;
                (unit.scale, Dimension(unit.dims))
            }
            Some(Token::Integer(1)) => (1.0, Dimension::NONE),
            Some(Token::Open) => {
                let inner = self.parse_product()?;
                if self.next() != Some(Token::Close) {
                    return Err(self.malformed("unbalanced parentheses"));
                }
                inner
            }
            _ => return Err(self.malformed("expected a unit symbol")),
        };

        if self.peek() == Some(&Token::Power) {
            self.pos += 1;
            let exponent = self.parse_exponent()?;
            let dims = dims
                .powi(exponent)
                .ok_or_else(|| self.malformed(EXPONENT_OUT_OF_RANGE))?;
            return Ok((scale.powi(exponent as i32), dims));
        }
        Ok((scale, dims))
    }

    fn parse_exponent(&mut self) -> Result<i8, UnitError> {
        match self.next() {
            Some(Token::Integer(n)) => Ok(n),
            Some(Token::Minus) => match self.next() {
                Some(Token::Integer(n)) => Ok(-n),
                _ => Err(self.malformed("expected an integer exponent")),
            },
            Some(Token::Open) => {
                let exponent = self.parse_exponent()?;
                if self.next() != Some(Token::Close) {
                    return Err(self.malformed("unbalanced parentheses"));
                }
                Ok(exponent)
            }
            _ => Err(self.malformed("expected an integer exponent")),
        }
    }
}
