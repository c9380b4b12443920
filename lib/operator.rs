//! Matrix-valued functions of time and parameters.
//!
//! An [`Operator`] is a sum of terms `c_k(t, params) M_k` where each `c_k` is
//! a [`Scalar`] and each `M_k` is a fixed square complex matrix. All matrices
//! of an operator are expressed relative to the same [`Basis`]; an operator
//! with no recorded basis is taken to be in the standard basis.

use ndarray::{ self as nd, Axis };
use num_complex::Complex64 as C64;
use rustc_hash::FxHashSet as HashSet;
use crate::{
    error::{ Error, Result },
    hilbert::{ Basis, dagger },
    params::{ ParamContext, Parameters, Scalar, TIME },
};

/// Matrix elements with modulus at or below this value do not couple states.
pub const COUPLING_TOL: f64 = 1e-12;

/// A single scalar-weighted matrix.
#[derive(Clone, Debug)]
pub struct Term {
    pub coefficient: Scalar,
    pub matrix: nd::Array2<C64>,
}

/// A parameter-dependent linear operator on a finite-dimensional space.
#[derive(Clone, Debug)]
pub struct Operator {
    terms: Vec<Term>,
    dim: usize,
    basis: Option<Basis>,
}

impl Operator {
    /// Create a new operator with no terms, evaluating to the zero matrix.
    pub fn zeros(dim: usize) -> Self {
        Self { terms: Vec::new(), dim, basis: None }
    }

    /// Create a new time- and parameter-independent operator.
    ///
    /// Fails if `matrix` is not square.
    pub fn from_matrix(matrix: nd::Array2<C64>) -> Result<Self> {
        let (n, m) = matrix.dim();
        if n != m {
            return Err(Error::DimensionMismatch { expected: n, found: m });
        }
        Self::zeros(n).with_term(1.0, matrix)
    }

    /// Add a term to `self`.
    ///
    /// Fails if `matrix` does not have the dimension of `self`.
    pub fn with_term<C>(mut self, coefficient: C, matrix: nd::Array2<C64>)
        -> Result<Self>
    where C: Into<Scalar>
    {
        if matrix.dim() != (self.dim, self.dim) {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                found: matrix.nrows().max(matrix.ncols()),
            });
        }
        self.terms.push(Term { coefficient: coefficient.into(), matrix });
        Ok(self)
    }

    /// Record that the matrices of `self` are expressed relative to `basis`.
    ///
    /// This does not change any matrix elements; see [`Self::change_basis`]
    /// for that.
    pub fn in_basis(mut self, basis: Basis) -> Result<Self> {
        if basis.dim() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                found: basis.dim(),
            });
        }
        self.basis = Some(basis);
        Ok(self)
    }

    /// Get the dimension of the space `self` acts on.
    pub fn dim(&self) -> usize { self.dim }

    /// Get the basis the matrices of `self` are expressed relative to, if
    /// recorded.
    pub fn basis(&self) -> Option<&Basis> { self.basis.as_ref() }

    /// Get a reference to all terms.
    pub fn terms(&self) -> &[Term] { &self.terms }

    /// Evaluate `self` as a matrix at time `t`.
    pub fn eval(&self, p: &Parameters, t: f64, params: &ParamContext)
        -> Result<nd::Array2<C64>>
    {
        let mut acc: nd::Array2<C64> = nd::Array2::zeros((self.dim, self.dim));
        for term in self.terms.iter() {
            let c = p.resolve(&term.coefficient, t, params)?;
            acc.scaled_add(C64::from(c), &term.matrix);
        }
        Ok(acc)
    }

    /// Apply `self` to a state vector from the left without forming the total
    /// matrix.
    pub fn apply(
        &self,
        p: &Parameters,
        state: nd::ArrayView1<C64>,
        t: f64,
        params: &ParamContext,
    ) -> Result<nd::Array1<C64>>
    {
        if state.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                found: state.len(),
            });
        }
        let mut acc: nd::Array1<C64> = nd::Array1::zeros(self.dim);
        for term in self.terms.iter() {
            let c = p.resolve(&term.coefficient, t, params)?;
            if c == 0.0 { continue; }
            acc.scaled_add(C64::from(c), &term.matrix.dot(&state));
        }
        Ok(acc)
    }

    /// Return the conjugate transpose of `self`.
    pub fn dagger(&self) -> Self {
        Self {
            terms: self.terms.iter()
                .map(|term| Term {
                    coefficient: term.coefficient.clone(),
                    matrix: dagger(&term.matrix),
                })
                .collect(),
            dim: self.dim,
            basis: self.basis.clone(),
        }
    }

    /// Re-express `self` relative to another basis.
    pub fn change_basis(&self, to: &Basis) -> Result<Self> {
        let from
            = self.basis.clone()
            .unwrap_or_else(|| Basis::standard(to.name(), self.dim));
        let terms: Vec<Term>
            = self.terms.iter()
            .map(|term| {
                from.convert_matrix(&term.matrix, to)
                    .map(|matrix| Term {
                        coefficient: term.coefficient.clone(),
                        matrix,
                    })
            })
            .collect::<Result<_>>()?;
        Ok(Self { terms, dim: self.dim, basis: Some(to.clone()) })
    }

    /// Project `self` onto the subspace spanned by the given basis indices, in
    /// the order given.
    ///
    /// The result carries no basis, since the restricted vectors no longer
    /// span the original space.
    pub fn restrict(&self, indices: &[usize]) -> Result<Self> {
        if let Some(&index) = indices.iter().find(|&&k| k >= self.dim) {
            return Err(Error::IndexOutOfBounds { index, dim: self.dim });
        }
        let terms: Vec<Term>
            = self.terms.iter()
            .map(|term| Term {
                coefficient: term.coefficient.clone(),
                matrix: term.matrix
                    .select(Axis(0), indices)
                    .select(Axis(1), indices),
            })
            .collect();
        Ok(Self { terms, dim: indices.len(), basis: None })
    }

    /// Fold every coefficient that can be resolved from `params` into a single
    /// constant term, keeping time dependence and dependence on the parameters
    /// named in `wrt`.
    ///
    /// Function-valued coefficients are always kept.
    pub fn collapse(&self, p: &Parameters, wrt: &[&str], params: &ParamContext)
        -> Self
    {
        let mut folded: Option<nd::Array2<C64>> = None;
        let mut kept: Vec<Term> = Vec::new();
        for term in self.terms.iter() {
            let value
                = match &term.coefficient {
                    Scalar::Constant(c) => Some(*c),
                    Scalar::Param(name)
                        if name == TIME || wrt.contains(&name.as_str())
                        => None,
                    Scalar::Param(name) => p.lookup(name, 0.0, params).ok(),
                    Scalar::Function(_) => None,
                };
            match value {
                Some(c) => {
                    folded
                        .get_or_insert_with(|| {
                            nd::Array2::zeros((self.dim, self.dim))
                        })
                        .scaled_add(C64::from(c), &term.matrix);
                },
                None => { kept.push(term.clone()); },
            }
        }
        let terms: Vec<Term>
            = folded.into_iter()
            .map(|matrix| Term { coefficient: Scalar::Constant(1.0), matrix })
            .chain(kept)
            .collect();
        Self { terms, dim: self.dim, basis: self.basis.clone() }
    }

    /// Compute the set of basis indices reachable from `indices` through
    /// non-zero matrix elements of `self`, evaluated in `params`.
    ///
    /// The returned set includes `indices` themselves.
    pub fn connected(
        &self,
        p: &Parameters,
        indices: &[usize],
        params: &ParamContext,
    ) -> Result<HashSet<usize>>
    {
        if let Some(&index) = indices.iter().find(|&&k| k >= self.dim) {
            return Err(Error::IndexOutOfBounds { index, dim: self.dim });
        }
        let m = self.eval(p, params.time(), params)?;
        let mut visited: HashSet<usize> = indices.iter().copied().collect();
        let mut stack: Vec<usize> = indices.to_vec();
        while let Some(i) = stack.pop() {
            for j in 0..self.dim {
                if visited.contains(&j) { continue; }
                if m[[i, j]].norm() > COUPLING_TOL
                    || m[[j, i]].norm() > COUPLING_TOL
                {
                    visited.insert(j);
                    stack.push(j);
                }
            }
        }
        Ok(visited)
    }
}
