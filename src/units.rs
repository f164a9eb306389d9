//! Tagged physical quantities for command and telemetry fields
//!
//! A `Quantity<U>` is a plain f64 carrying a zero-sized unit tag, so a pan
//! angle in degrees and a height in meters cannot be mixed up at compile
//! time. The only cross-unit conversion is between the two angle units.

use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Marker implemented by every unit tag.
pub trait Unit: Copy + 'static {
    const SYMBOL: &'static str;
}

/// Marker for angle units; `RAD_PER_UNIT` is radians per one of this unit.
pub trait Angle: Unit {
    const RAD_PER_UNIT: f64;
}

/// Plane angle in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deg;

/// Plane angle in radians.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rad;

/// Length in meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meters;

/// Dimensionless value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scalar;

impl Unit for Deg {
    const SYMBOL: &'static str = "deg";
}

impl Unit for Rad {
    const SYMBOL: &'static str = "rad";
}

impl Unit for Meters {
    const SYMBOL: &'static str = "m";
}

impl Unit for Scalar {
    const SYMBOL: &'static str = "";
}

impl Angle for Deg {
    const RAD_PER_UNIT: f64 = std::f64::consts::PI / 180.0;
}

impl Angle for Rad {
    const RAD_PER_UNIT: f64 = 1.0;
}

/// Unit constructors, so quantities read as `90.0 * DEG`.
pub const DEG: Deg = Deg;
pub const RAD: Rad = Rad;
pub const METERS: Meters = Meters;

/// A numeric value tagged with its physical unit.
#[derive(Debug, Serialize, Deserialize)]
#[serde(transparent, bound(serialize = "", deserialize = ""))]
pub struct Quantity<U: Unit> {
    value: f64,
    #[serde(skip)]
    _unit: PhantomData<U>,
}

impl<U: Unit> Quantity<U> {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            _unit: PhantomData,
        }
    }

    /// The raw numeric value, in this quantity's own unit.
    pub fn magnitude(&self) -> f64 {
        self.value
    }
}

impl<U: Angle> Quantity<U> {
    /// Convert between angle units. Defined only for degree/radian; other
    /// unit pairs do not satisfy the bounds and fail to compile.
    pub fn to<V: Angle>(&self) -> Quantity<V> {
        Quantity::new(self.value * U::RAD_PER_UNIT / V::RAD_PER_UNIT)
    }
}

impl<U: Unit> Clone for Quantity<U> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<U: Unit> Copy for Quantity<U> {}

impl<U: Unit> PartialEq for Quantity<U> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<U: Unit> PartialOrd for Quantity<U> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.value.partial_cmp(&other.value)
    }
}

impl<U: Unit> Default for Quantity<U> {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl<U: Unit> Add for Quantity<U> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.value + rhs.value)
    }
}

impl<U: Unit> Sub for Quantity<U> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.value - rhs.value)
    }
}

impl<U: Unit> Neg for Quantity<U> {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.value)
    }
}

impl<U: Unit> Mul<f64> for Quantity<U> {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.value * rhs)
    }
}

impl<U: Unit> Div<f64> for Quantity<U> {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self::new(self.value / rhs)
    }
}

impl Mul<Deg> for f64 {
    type Output = Quantity<Deg>;
    fn mul(self, _unit: Deg) -> Quantity<Deg> {
        Quantity::new(self)
    }
}

impl Mul<Rad> for f64 {
    type Output = Quantity<Rad>;
    fn mul(self, _unit: Rad) -> Quantity<Rad> {
        Quantity::new(self)
    }
}

impl Mul<Meters> for f64 {
    type Output = Quantity<Meters>;
    fn mul(self, _unit: Meters) -> Quantity<Meters> {
        Quantity::new(self)
    }
}

impl<U: Unit> std::fmt::Display for Quantity<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if U::SYMBOL.is_empty() {
            write!(f, "{}", self.value)
        } else {
            write!(f, "{}{}", self.value, U::SYMBOL)
        }
    }
}
