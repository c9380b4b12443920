//! Interface to the quantum system an analysis runs against.

use indexmap::IndexMap;
use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    error::{ Error, Result },
    hilbert::Basis,
    operator::Operator,
    params::{ ParamContext, Parameters },
};

/// Basic requirements for a system handed to
/// [`energy_spectrum`][crate::spectrum::energy_spectrum].
#[allow(non_snake_case)]
pub trait QuantumSystem {
    /// Dimension of the system's Hilbert space.
    fn dim(&self) -> usize;

    /// Units and default parameter values.
    fn p(&self) -> &Parameters;

    /// Build a Hamiltonian from named components; an empty list selects every
    /// component.
    fn H(&self, components: &[&str]) -> Result<Operator>;

    /// Look up a basis by name; `None` selects the standard basis.
    fn basis(&self, name: Option<&str>) -> Result<Basis>;

    /// Re-express state vectors given relative to the `input` basis relative
    /// to the `output` basis.
    fn subspace(
        &self,
        states: &[nd::Array1<C64>],
        input: Option<&str>,
        output: Option<&str>,
        _params: &ParamContext,
    ) -> Result<Vec<nd::Array1<C64>>>
    {
        let input = self.basis(input)?;
        let output = self.basis(output)?;
        states.iter()
            .map(|state| input.convert_state(state, &output))
            .collect()
    }
}

/// Name of the standard basis of a [`System`].
pub const STANDARD_BASIS: &str = "standard";

/// A system described by a collection of named Hamiltonian components and
/// named bases.
#[derive(Clone, Debug)]
pub struct System {
    p: Parameters,
    dim: usize,
    components: IndexMap<String, Operator>,
    bases: IndexMap<String, Basis>,
}

impl System {
    /// Create a new `System` with no components.
    pub fn new(p: Parameters, dim: usize) -> Self {
        let mut bases: IndexMap<String, Basis> = IndexMap::new();
        bases.insert(
            STANDARD_BASIS.to_string(),
            Basis::standard(STANDARD_BASIS, dim),
        );
        Self { p, dim, components: IndexMap::new(), bases }
    }

    /// Add a named Hamiltonian component.
    ///
    /// Components are stored relative to the standard basis.
    pub fn with_component<S>(mut self, name: S, op: Operator) -> Result<Self>
    where S: Into<String>
    {
        if op.dim() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                found: op.dim(),
            });
        }
        let standard = &self.bases[STANDARD_BASIS];
        let op = op.change_basis(standard)?;
        self.components.insert(name.into(), op);
        Ok(self)
    }

    /// Add a basis, keyed by its name.
    pub fn with_basis(mut self, basis: Basis) -> Result<Self> {
        if basis.dim() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                found: basis.dim(),
            });
        }
        self.bases.insert(basis.name().to_string(), basis);
        Ok(self)
    }
}

#[allow(non_snake_case)]
impl QuantumSystem for System {
    fn dim(&self) -> usize { self.dim }

    fn p(&self) -> &Parameters { &self.p }

    fn H(&self, components: &[&str]) -> Result<Operator> {
        let standard = self.bases[STANDARD_BASIS].clone();
        let mut acc = Operator::zeros(self.dim).in_basis(standard)?;
        let selected: Vec<&Operator>
            = if components.is_empty() {
                self.components.values().collect()
            } else {
                components.iter()
                    .map(|name| {
                        self.components.get(*name)
                            .ok_or_else(|| {
                                Error::UnknownComponent(name.to_string())
                            })
                    })
                    .collect::<Result<_>>()?
            };
        for op in selected {
            for term in op.terms() {
                acc = acc.with_term(
                    term.coefficient.clone(), term.matrix.clone())?;
            }
        }
        Ok(acc)
    }

    fn basis(&self, name: Option<&str>) -> Result<Basis> {
        let name = name.unwrap_or(STANDARD_BASIS);
        self.bases.get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownBasis(name.to_string()))
    }
}
