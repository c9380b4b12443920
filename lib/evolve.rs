//! Numerical integration of a state under a set of state operators.
//!
//! The last index of an output array corresponds to time.

use ndarray::{ self as nd, s, Dimension };
use num_complex::Complex64 as C64;
use tracing::debug;
use crate::{
    error::{ Error, Result },
    hilbert::outer_prod,
    params::ParamContext,
    stateops::{ StateOp, StateOperator, StateShape },
};

/// Append a time axis to a state shape.
pub trait NewAxis: nd::Dimension {
    fn new_axis(self, size: usize) -> <Self::Larger as Dimension>::Pattern;
}

impl NewAxis for nd::Ix1 {
    fn new_axis(self, new_size: usize) -> (usize, usize) {
        let n = self.into_pattern();
        (n, new_size)
    }
}

impl NewAxis for nd::Ix2 {
    fn new_axis(self, new_size: usize) -> (usize, usize, usize) {
        let (a, b) = self.into_pattern();
        (a, b, new_size)
    }
}

/// Mutable access to the state at a single time index.
pub trait TimeView<D>
where D: nd::Dimension
{
    type ViewMut<'a> where Self: 'a;

    fn view_time_mut(&mut self, k: usize) -> Self::ViewMut<'_>;
}

impl TimeView<nd::Ix1> for nd::Array2<C64> {
    type ViewMut<'a> = nd::ArrayViewMut1<'a, C64> where Self: 'a;

    fn view_time_mut(&mut self, k: usize) -> Self::ViewMut<'_> {
        self.slice_mut(s![.., k])
    }
}

impl TimeView<nd::Ix2> for nd::Array3<C64> {
    type ViewMut<'a> = nd::ArrayViewMut2<'a, C64> where Self: 'a;

    fn view_time_mut(&mut self, k: usize) -> Self::ViewMut<'_> {
        self.slice_mut(s![.., .., k])
    }
}

/// Compute a "norm" of an object, treating it as a representation of a quantum
/// state.
pub trait StateNorm {
    fn state_norm(&self) -> C64;
}

/// The norm of a state vector is the quadrature sum of its elements.
impl StateNorm for nd::Array1<C64> {
    fn state_norm(&self) -> C64 { self.mapv(|a| a * a.conj()).sum().sqrt() }
}

/// The norm of a density matrix is its trace.
impl StateNorm for nd::Array2<C64> {
    fn state_norm(&self) -> C64 { self.diag().iter().sum() }
}

fn array_diff(arr: &nd::Array1<f64>) -> nd::Array1<f64> {
    arr.iter().zip(arr.iter().skip(1))
        .map(|(ak, akp1)| *akp1 - *ak)
        .collect()
}

/// Integration scheme.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Stepper {
    /// First-order forward Euler.
    Euler,
    /// Fourth-order Runge-Kutta.
    #[default]
    RungeKutta4,
}

/// Output of [`Evolution::evolve_auto`].
#[derive(Clone, Debug, PartialEq)]
pub enum Trajectory {
    /// State vectors; the second index is time.
    Pure(nd::Array2<C64>),
    /// Density matrices; the third index is time.
    Ensemble(nd::Array3<C64>),
}

impl Trajectory {
    /// Populations of each basis state; the second index is time.
    pub fn populations(&self) -> nd::Array2<f64> {
        match self {
            Self::Pure(psi) => psi.mapv(|a| a.norm_sqr()),
            Self::Ensemble(rho) => {
                let (n, _, nt) = rho.dim();
                nd::Array2::from_shape_fn(
                    (n, nt), |(i, k)| rho[[i, i, k]].re)
            },
        }
    }
}

/// Integrates `dz/dt = Σ_k L_k(z, t)` for a set of state operators `L_k`.
#[derive(Clone, Debug)]
pub struct Evolution {
    operators: Vec<StateOperator>,
    params: ParamContext,
    stepper: Stepper,
}

impl Evolution {
    /// Create a new `Evolution` with empty parameters and a fourth-order
    /// Runge-Kutta stepper.
    pub fn new<I>(operators: I) -> Self
    where I: IntoIterator<Item = StateOperator>
    {
        Self {
            operators: operators.into_iter().collect(),
            params: ParamContext::new(),
            stepper: Stepper::default(),
        }
    }

    /// Set the parameter values passed to every operator.
    pub fn with_params(mut self, params: ParamContext) -> Self {
        self.params = params;
        self
    }

    /// Set the integration scheme.
    pub fn with_stepper(mut self, stepper: Stepper) -> Self {
        self.stepper = stepper;
        self
    }

    pub fn operators(&self) -> &[StateOperator] { &self.operators }

    pub fn params(&self) -> &ParamContext { &self.params }

    pub fn stepper(&self) -> Stepper { self.stepper }

    /// Return `true` if any operator cannot act on a pure state.
    pub fn requires_ensemble(&self) -> bool {
        self.operators.iter().any(|op| !op.for_state())
    }

    /// Check that every operator can act on a state with `ndim` axes.
    pub fn check_shape(&self, ndim: usize) -> Result<()> {
        let unsupported = |operator: &'static str| {
            Error::UnsupportedStateShape { operator, ndim }
        };
        let Some(shape) = StateShape::from_ndim(ndim) else {
            let name = self.operators.first()
                .map(|op| op.name())
                .unwrap_or("Evolution");
            return Err(unsupported(name));
        };
        match self.operators.iter().find(|op| !op.supports(shape)) {
            Some(op) => Err(unsupported(op.name())),
            None => Ok(()),
        }
    }

    /// Sum of the actions of all operators on `z` at time `t`.
    ///
    /// Dummy operators only select the state shape and contribute nothing.
    pub fn rhs<D>(&self, z: &nd::Array<C64, D>, t: f64)
        -> Result<nd::Array<C64, D>>
    where D: Dimension
    {
        let mut acc: nd::Array<C64, D> = nd::Array::zeros(z.raw_dim());
        let dynamical
            = self.operators.iter()
            .filter(|op| !matches!(op, StateOperator::Dummy(_)));
        for op in dynamical {
            acc += &op.call(z, t, &self.params)?;
        }
        Ok(acc)
    }

    fn step<D>(&self, z: &nd::Array<C64, D>, t: f64, dt: f64)
        -> Result<nd::Array<C64, D>>
    where D: Dimension
    {
        match self.stepper {
            Stepper::Euler => {
                let k1 = self.rhs(z, t)?;
                Ok(z + &(k1 * dt))
            },
            Stepper::RungeKutta4 => {
                let k1 = self.rhs(z, t)?;
                let k2 = self.rhs(&(z + &(&k1 * (dt / 2.0))), t + dt / 2.0)?;
                let k3 = self.rhs(&(z + &(&k2 * (dt / 2.0))), t + dt / 2.0)?;
                let k4 = self.rhs(&(z + &(&k3 * dt)), t + dt)?;
                Ok(z + &((k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0)))
            },
        }
    }

    /// Integrate from `z0` over `times`, renormalizing after every step.
    ///
    /// `z0` is either a state vector or a density matrix, and every operator
    /// must support its shape. The first time slice of the output is `z0`.
    pub fn evolve<D>(&self, z0: &nd::Array<C64, D>, times: &nd::Array1<f64>)
        -> Result<nd::Array<C64, D::Larger>>
    where
        D: nd::Dimension + NewAxis + Copy + 'static,
        nd::Array<C64, D>: StateNorm,
        for<'a> nd::Array<C64, D::Larger>:
            TimeView<D, ViewMut<'a> = nd::ArrayViewMut<'a, C64, D>>,
    {
        self.check_shape(z0.ndim())?;
        let n = times.len();
        let mut z: nd::Array<C64, D::Larger>
            = nd::Array::zeros(z0.raw_dim().new_axis(n));
        if n == 0 { return Ok(z); }
        debug!(
            steps = n - 1,
            stepper = ?self.stepper,
            operators = self.operators.len(),
            "evolving state"
        );
        let dt = array_diff(times);
        let mut z_old: nd::Array<C64, D> = z0.clone();
        z.view_time_mut(0).assign(z0);
        let iter = dt.iter().zip(times).enumerate();
        for (k, (&dtk, &tk)) in iter {
            let z_new = self.step(&z_old, tk, dtk)?;
            let norm = z_new.state_norm();
            z_old = z_new / norm;
            z.view_time_mut(k + 1).assign(&z_old);
        }
        Ok(z)
    }

    /// Integrate a pure initial state, lifting it to a density matrix if any
    /// operator requires ensemble evolution.
    pub fn evolve_auto(
        &self,
        psi0: &nd::Array1<C64>,
        times: &nd::Array1<f64>,
    ) -> Result<Trajectory>
    {
        if self.requires_ensemble() {
            let ensemble_only: Vec<&str>
                = self.operators.iter()
                .filter(|op| !op.for_state())
                .map(|op| op.name())
                .collect();
            debug!(
                operators = ?ensemble_only,
                "state operators require ensemble evolution"
            );
            let rho0 = outer_prod(psi0, psi0);
            self.evolve(&rho0, times).map(Trajectory::Ensemble)
        } else {
            self.evolve(psi0, times).map(Trajectory::Pure)
        }
    }
}
