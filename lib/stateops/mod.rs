//! Operators giving the instantaneous action of a dynamical process on a
//! quantum state.
//!
//! A state is either a pure state vector (1D array) or an ensemble, i.e. a
//! density matrix (2D array). Each operator declares which of the two it can
//! act on through [`StateOp::for_state`] and [`StateOp::for_ensemble`]; an
//! integrator must consult these before dispatching. All structural
//! operations return new operators and leave `self` untouched.

use ndarray::{ self as nd, Dimension };
use num_complex::Complex64 as C64;
use rustc_hash::FxHashSet as HashSet;
use crate::{
    error::{ Error, Result },
    operator::Operator,
    params::ParamContext,
};

pub mod dummy;
pub use dummy::DummyStateOperator;

pub mod schrodinger;
pub use schrodinger::SchrodingerStateOperator;

pub mod lindblad;
pub use lindblad::LindbladStateOperator;

/// Representation of a quantum state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StateShape {
    /// A state vector.
    Pure,
    /// A density matrix.
    Ensemble,
}

impl StateShape {
    /// Classify an array by its number of axes.
    pub fn from_ndim(ndim: usize) -> Option<Self> {
        match ndim {
            1 => Some(Self::Pure),
            2 => Some(Self::Ensemble),
            _ => None,
        }
    }
}

/// Basic requirements for any state operator.
pub trait StateOp: Sized {
    /// Name of the operator kind, used in error messages.
    fn name(&self) -> &'static str;

    /// Return `true` if `self` can act on a pure state vector.
    fn for_state(&self) -> bool;

    /// Return `true` if `self` can act on a density matrix.
    fn for_ensemble(&self) -> bool;

    /// Return `true` if `self` can act on a state of the given shape.
    fn supports(&self, shape: StateShape) -> bool {
        match shape {
            StateShape::Pure => self.for_state(),
            StateShape::Ensemble => self.for_ensemble(),
        }
    }

    /// Label of the basis the owned operators are expressed in, if known.
    fn basis(&self) -> Option<&str>;

    /// Act on a pure state vector.
    fn act_pure(
        &self,
        _psi: nd::ArrayView1<C64>,
        _t: f64,
        _params: &ParamContext,
    ) -> Result<nd::Array1<C64>>
    {
        Err(Error::UnsupportedStateShape { operator: self.name(), ndim: 1 })
    }

    /// Act on a density matrix.
    fn act_ensemble(
        &self,
        rho: nd::ArrayView2<C64>,
        t: f64,
        params: &ParamContext,
    ) -> Result<nd::Array2<C64>>;

    /// Compute the action of `self` on `state` at time `t`.
    ///
    /// The result has the same shape as `state`. Fails if the shape of
    /// `state` is not supported.
    fn call<D>(&self, state: &nd::Array<C64, D>, t: f64, params: &ParamContext)
        -> Result<nd::Array<C64, D>>
    where D: Dimension
    {
        match StateShape::from_ndim(state.ndim()) {
            Some(StateShape::Pure) if self.for_state() => {
                let psi = state.view().into_dimensionality::<nd::Ix1>()?;
                Ok(self.act_pure(psi, t, params)?.into_dimensionality::<D>()?)
            },
            Some(StateShape::Ensemble) if self.for_ensemble() => {
                let rho = state.view().into_dimensionality::<nd::Ix2>()?;
                Ok(
                    self.act_ensemble(rho, t, params)?
                        .into_dimensionality::<D>()?
                )
            },
            _ => Err(Error::UnsupportedStateShape {
                operator: self.name(),
                ndim: state.ndim(),
            }),
        }
    }

    /// Re-express every owned operator through `f`, usually a change of basis.
    fn transform<F>(&self, f: F) -> Result<Self>
    where F: Fn(&Operator) -> Result<Operator>;

    /// Restrict every owned operator to the subspace spanned by `indices`.
    fn restrict(&self, indices: &[usize]) -> Result<Self>;

    /// Compute the set of basis indices coupled to `indices` by the owned
    /// operators.
    fn connected(&self, indices: &[usize], params: &ParamContext)
        -> Result<HashSet<usize>>;

    /// Fold every parameter not named in `wrt` into the owned operators.
    fn collapse(&self, wrt: &[&str], params: &ParamContext) -> Self;
}

pub(crate) fn check_ensemble(rho: &nd::ArrayView2<C64>, dim: usize)
    -> Result<()>
{
    if rho.dim() != (dim, dim) {
        return Err(Error::DimensionMismatch {
            expected: dim,
            found: rho.nrows().max(rho.ncols()),
        });
    }
    Ok(())
}

/// The closed set of state operators.
#[derive(Clone, Debug)]
pub enum StateOperator {
    Dummy(DummyStateOperator),
    Schrodinger(SchrodingerStateOperator),
    Lindblad(LindbladStateOperator),
}

impl From<DummyStateOperator> for StateOperator {
    fn from(op: DummyStateOperator) -> Self { Self::Dummy(op) }
}

impl From<SchrodingerStateOperator> for StateOperator {
    fn from(op: SchrodingerStateOperator) -> Self { Self::Schrodinger(op) }
}

impl From<LindbladStateOperator> for StateOperator {
    fn from(op: LindbladStateOperator) -> Self { Self::Lindblad(op) }
}

macro_rules! dispatch {
    ( $self:expr, $op:ident => $body:expr ) => {
        match $self {
            StateOperator::Dummy($op) => $body,
            StateOperator::Schrodinger($op) => $body,
            StateOperator::Lindblad($op) => $body,
        }
    };
    ( $self:expr, $op:ident => $body:expr, wrap ) => {
        match $self {
            StateOperator::Dummy($op) => $body.map(StateOperator::Dummy),
            StateOperator::Schrodinger($op)
                => $body.map(StateOperator::Schrodinger),
            StateOperator::Lindblad($op)
                => $body.map(StateOperator::Lindblad),
        }
    };
}

impl StateOp for StateOperator {
    fn name(&self) -> &'static str { dispatch!(self, op => op.name()) }

    fn for_state(&self) -> bool { dispatch!(self, op => op.for_state()) }

    fn for_ensemble(&self) -> bool { dispatch!(self, op => op.for_ensemble()) }

    fn basis(&self) -> Option<&str> { dispatch!(self, op => op.basis()) }

    fn act_pure(
        &self,
        psi: nd::ArrayView1<C64>,
        t: f64,
        params: &ParamContext,
    ) -> Result<nd::Array1<C64>>
    {
        dispatch!(self, op => op.act_pure(psi, t, params))
    }

    fn act_ensemble(
        &self,
        rho: nd::ArrayView2<C64>,
        t: f64,
        params: &ParamContext,
    ) -> Result<nd::Array2<C64>>
    {
        dispatch!(self, op => op.act_ensemble(rho, t, params))
    }

    fn call<D>(&self, state: &nd::Array<C64, D>, t: f64, params: &ParamContext)
        -> Result<nd::Array<C64, D>>
    where D: Dimension
    {
        dispatch!(self, op => op.call(state, t, params))
    }

    fn transform<F>(&self, f: F) -> Result<Self>
    where F: Fn(&Operator) -> Result<Operator>
    {
        dispatch!(self, op => op.transform(f), wrap)
    }

    fn restrict(&self, indices: &[usize]) -> Result<Self> {
        dispatch!(self, op => op.restrict(indices), wrap)
    }

    fn connected(&self, indices: &[usize], params: &ParamContext)
        -> Result<HashSet<usize>>
    {
        dispatch!(self, op => op.connected(indices, params))
    }

    fn collapse(&self, wrt: &[&str], params: &ParamContext) -> Self {
        match self {
            Self::Dummy(op) => Self::Dummy(op.collapse(wrt, params)),
            Self::Schrodinger(op)
                => Self::Schrodinger(op.collapse(wrt, params)),
            Self::Lindblad(op) => Self::Lindblad(op.collapse(wrt, params)),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use ndarray as nd;
    use num_complex::Complex64 as C64;

    pub fn c(re: f64, im: f64) -> C64 { C64::new(re, im) }

    pub fn sx() -> nd::Array2<C64> {
        nd::array![[0.0, 1.0], [1.0, 0.0]].mapv(C64::from)
    }

    pub fn sz() -> nd::Array2<C64> {
        nd::array![[1.0, 0.0], [0.0, -1.0]].mapv(C64::from)
    }

    /// `amp |0⟩⟨1|`, taking the excited state `|1⟩` to the ground state.
    pub fn lowering(amp: f64) -> nd::Array2<C64> {
        nd::array![[0.0, amp], [0.0, 0.0]].mapv(C64::from)
    }

    pub fn max_diff<D>(a: &nd::Array<C64, D>, b: &nd::Array<C64, D>) -> f64
    where D: nd::Dimension
    {
        a.iter().zip(b.iter())
            .map(|(x, y)| (x - y).norm())
            .fold(0.0, f64::max)
    }
}
