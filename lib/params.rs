//! Parameter contexts, physical units, and expansion of parameter sweeps.
//!
//! Every operator evaluation receives a [`ParamContext`] mapping parameter
//! names to values. Quantities that depend on those values are described by a
//! [`Scalar`] and resolved against a context together with the defaults held
//! by [`Parameters`].

use std::{
    fmt,
    ops::{ Deref, DerefMut },
    sync::Arc,
};
use indexmap::IndexMap;
use ndarray as nd;
use crate::error::{ Error, Result };

/// Reserved parameter name carrying the evaluation time.
pub const TIME: &str = "t";

/// Ordered mapping from parameter names to numerical values.
///
/// This collection is backed by a single [`IndexMap`], which can be accessed
/// via [`Deref`] and [`DerefMut`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamContext(IndexMap<String, f64>);

impl Deref for ParamContext {
    type Target = IndexMap<String, f64>;

    fn deref(&self) -> &Self::Target { &self.0 }
}

impl DerefMut for ParamContext {
    fn deref_mut(&mut self) -> &mut Self::Target { &mut self.0 }
}

impl<S> FromIterator<(S, f64)> for ParamContext
where S: Into<String>
{
    fn from_iter<I>(iter: I) -> Self
    where I: IntoIterator<Item = (S, f64)>
    {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl ParamContext {
    /// Create a new, empty context.
    pub fn new() -> Self { Self::default() }

    /// Return `self` with `name` set to `value`.
    pub fn with<S: Into<String>>(mut self, name: S, value: f64) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    /// Return a copy of `self` updated with every entry of `other`, with
    /// `other` taking precedence.
    pub fn merged(&self, other: &ParamContext) -> Self {
        let mut out = self.clone();
        out.0.extend(other.0.iter().map(|(k, v)| (k.clone(), *v)));
        out
    }

    /// Return the value of the time parameter, defaulting to zero.
    pub fn time(&self) -> f64 { self.0.get(TIME).copied().unwrap_or(0.0) }
}

/// Heap-allocated [`Fn`] trait object computing a scalar from a time and a
/// parameter context.
pub type ScalarFn = Arc<dyn Fn(f64, &ParamContext) -> f64 + Send + Sync>;

/// A real quantity that may depend on time and parameter values.
#[derive(Clone)]
pub enum Scalar {
    /// A fixed number.
    Constant(f64),
    /// The value of a named parameter.
    Param(String),
    /// A function of time and the parameter context.
    Function(ScalarFn),
}

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(x) => write!(f, "Constant({:?})", x),
            Self::Param(name) => write!(f, "Param({:?})", name),
            Self::Function(_) => write!(f, "Function(...)"),
        }
    }
}

impl From<f64> for Scalar {
    fn from(x: f64) -> Self { Self::Constant(x) }
}

impl From<&str> for Scalar {
    fn from(name: &str) -> Self { Self::Param(name.to_string()) }
}

impl From<String> for Scalar {
    fn from(name: String) -> Self { Self::Param(name) }
}

impl Scalar {
    /// Create a new [`Self::Param`].
    pub fn param<S: Into<String>>(name: S) -> Self { Self::Param(name.into()) }

    /// Create a new [`Self::Function`].
    pub fn from_fn<F>(f: F) -> Self
    where F: Fn(f64, &ParamContext) -> f64 + Send + Sync + 'static
    {
        Self::Function(Arc::new(f))
    }

    /// Return the fixed value of a [`Self::Constant`].
    pub fn as_constant(&self) -> Option<f64> {
        match self {
            Self::Constant(x) => Some(*x),
            _ => None,
        }
    }
}

/// A single sweep axis.
#[derive(Clone, Debug)]
pub enum RangeSpec {
    /// Explicit values, used as given.
    Values(Vec<f64>),
    /// `num` evenly spaced values from `start` to `stop`, inclusive.
    Linear { start: Scalar, stop: Scalar, num: usize },
    /// `num` geometrically spaced values from `start` to `stop`, inclusive.
    /// Both endpoints must be non-zero and share a sign.
    Geometric { start: Scalar, stop: Scalar, num: usize },
}

impl RangeSpec {
    /// Create a new [`Self::Values`].
    pub fn values<I>(values: I) -> Self
    where I: IntoIterator<Item = f64>
    {
        Self::Values(values.into_iter().collect())
    }

    /// Create a new [`Self::Linear`].
    pub fn linear<A, B>(start: A, stop: B, num: usize) -> Self
    where
        A: Into<Scalar>,
        B: Into<Scalar>,
    {
        Self::Linear { start: start.into(), stop: stop.into(), num }
    }

    /// Create a new [`Self::Geometric`].
    pub fn geometric<A, B>(start: A, stop: B, num: usize) -> Self
    where
        A: Into<Scalar>,
        B: Into<Scalar>,
    {
        Self::Geometric { start: start.into(), stop: stop.into(), num }
    }

    fn expand(&self, p: &Parameters, context: &ParamContext)
        -> Result<Vec<f64>>
    {
        let t = context.time();
        match self {
            Self::Values(values) => Ok(values.clone()),
            Self::Linear { start, stop, num } => {
                let a = p.resolve(start, t, context)?;
                let b = p.resolve(stop, t, context)?;
                Ok(nd::Array1::linspace(a, b, *num).to_vec())
            },
            Self::Geometric { start, stop, num } => {
                let a = p.resolve(start, t, context)?;
                let b = p.resolve(stop, t, context)?;
                if a == 0.0 || b == 0.0 || a.signum() != b.signum() {
                    return Err(Error::InvalidRangeSpec(format!(
                        "geometric range endpoints {} and {} must be non-zero \
                        with equal sign",
                        a, b,
                    )));
                }
                let sign = a.signum();
                Ok(
                    nd::Array1::linspace(a.abs().ln(), b.abs().ln(), *num)
                        .mapv(|x| sign * x.exp())
                        .to_vec()
                )
            },
        }
    }
}

/// A parameter sweep description.
///
/// Only [`Self::Single`], a single mapping from names to [`RangeSpec`]s
/// iterated in lockstep, can be expanded; multi-dimensional sweeps given as a
/// list of mappings are rejected.
#[derive(Clone, Debug)]
pub enum Ranges {
    Single(IndexMap<String, RangeSpec>),
    Multi(Vec<IndexMap<String, RangeSpec>>),
}

impl From<IndexMap<String, RangeSpec>> for Ranges {
    fn from(ranges: IndexMap<String, RangeSpec>) -> Self { Self::Single(ranges) }
}

impl<S> FromIterator<(S, RangeSpec)> for Ranges
where S: Into<String>
{
    fn from_iter<I>(iter: I) -> Self
    where I: IntoIterator<Item = (S, RangeSpec)>
    {
        Self::Single(iter.into_iter().map(|(k, r)| (k.into(), r)).collect())
    }
}

impl Ranges {
    /// Return the underlying mapping if `self` is a [`Self::Single`].
    pub fn as_single(&self) -> Result<&IndexMap<String, RangeSpec>> {
        match self {
            Self::Single(ranges) => Ok(ranges),
            Self::Multi(_) => Err(Error::InvalidRangeSpec(
                "multi-dimensional ranges are not supported; ranges must be \
                a single mapping".to_string()
            )),
        }
    }
}

/// Physical units and default parameter values.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameters {
    c_hbar: f64,
    defaults: ParamContext,
}

impl Default for Parameters {
    fn default() -> Self {
        Self { c_hbar: 1.0, defaults: ParamContext::default() }
    }
}

impl Parameters {
    /// Create a new `Parameters` with a given value of ħ.
    pub fn new(c_hbar: f64) -> Self {
        Self { c_hbar, defaults: ParamContext::default() }
    }

    /// Return `self` with a default value for `name`.
    pub fn with_default<S: Into<String>>(mut self, name: S, value: f64) -> Self {
        self.defaults.insert(name.into(), value);
        self
    }

    /// Reduced Planck constant in the unit system of the simulation.
    pub fn c_hbar(&self) -> f64 { self.c_hbar }

    /// Get a reference to the default parameter values.
    pub fn defaults(&self) -> &ParamContext { &self.defaults }

    /// Look up a parameter value, preferring `params` over the defaults.
    pub fn lookup(&self, name: &str, t: f64, params: &ParamContext)
        -> Result<f64>
    {
        if name == TIME { return Ok(t); }
        params.get(name)
            .or_else(|| self.defaults.get(name))
            .copied()
            .ok_or_else(|| Error::UnknownParameter(name.to_string()))
    }

    /// Resolve a [`Scalar`] at time `t` in the context `params`.
    pub fn resolve(&self, value: &Scalar, t: f64, params: &ParamContext)
        -> Result<f64>
    {
        match value {
            Scalar::Constant(x) => Ok(*x),
            Scalar::Param(name) => self.lookup(name, t, params),
            Scalar::Function(f) => {
                Ok(f(t, &self.defaults.merged(params)))
            },
        }
    }

    /// Expand a set of named ranges into equal-length value sequences.
    ///
    /// Range endpoints are resolved in `context`, so a range may refer to
    /// other parameters.
    pub fn range(
        &self,
        ranges: &IndexMap<String, RangeSpec>,
        context: &ParamContext,
    ) -> Result<IndexMap<String, Vec<f64>>>
    {
        if ranges.is_empty() {
            return Err(Error::InvalidRangeSpec(
                "at least one range is required".to_string()
            ));
        }
        let mut expanded: IndexMap<String, Vec<f64>> = IndexMap::new();
        let mut len: Option<usize> = None;
        for (name, spec) in ranges.iter() {
            let values = spec.expand(self, context)?;
            match len {
                Some(n) if n != values.len() => {
                    return Err(Error::RangeLengthMismatch {
                        name: name.clone(),
                        expected: n,
                        found: values.len(),
                    });
                },
                Some(_) => { },
                None => { len = Some(values.len()); },
            }
            expanded.insert(name.clone(), values);
        }
        Ok(expanded)
    }
}
