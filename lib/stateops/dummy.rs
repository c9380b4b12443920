//! Placeholder operator with no dynamics of its own.

use ndarray::{ self as nd, Dimension };
use num_complex::Complex64 as C64;
use rustc_hash::FxHashSet as HashSet;
use crate::{
    error::Result,
    operator::Operator,
    params::ParamContext,
    stateops::StateOp,
};

/// Returns its input unchanged, ignoring time and parameters.
///
/// Declared as ensemble-only, but [`call`][StateOp::call] accepts any shape;
/// the capability flags are left to the integrator.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DummyStateOperator;

impl DummyStateOperator {
    /// Create a new `DummyStateOperator`.
    pub fn new() -> Self { Self }
}

impl StateOp for DummyStateOperator {
    fn name(&self) -> &'static str { "Dummy" }

    fn for_state(&self) -> bool { false }

    fn for_ensemble(&self) -> bool { true }

    fn basis(&self) -> Option<&str> { None }

    fn act_pure(
        &self,
        psi: nd::ArrayView1<C64>,
        _t: f64,
        _params: &ParamContext,
    ) -> Result<nd::Array1<C64>>
    {
        Ok(psi.to_owned())
    }

    fn act_ensemble(
        &self,
        rho: nd::ArrayView2<C64>,
        _t: f64,
        _params: &ParamContext,
    ) -> Result<nd::Array2<C64>>
    {
        Ok(rho.to_owned())
    }

    fn call<D>(&self, state: &nd::Array<C64, D>, _t: f64, _params: &ParamContext)
        -> Result<nd::Array<C64, D>>
    where D: Dimension
    {
        Ok(state.clone())
    }

    fn transform<F>(&self, _f: F) -> Result<Self>
    where F: Fn(&Operator) -> Result<Operator>
    {
        Ok(*self)
    }

    fn restrict(&self, _indices: &[usize]) -> Result<Self> { Ok(*self) }

    fn connected(&self, indices: &[usize], _params: &ParamContext)
        -> Result<HashSet<usize>>
    {
        Ok(indices.iter().copied().collect())
    }

    fn collapse(&self, _wrt: &[&str], _params: &ParamContext) -> Self { *self }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::stateops::test_utils::*;

    #[test]
    fn identity_on_any_shape() {
        let op = DummyStateOperator::new();
        let ctx = ParamContext::new().with("x", 3.0);
        let psi: nd::Array1<C64> = nd::array![c(0.6, 0.0), c(0.0, 0.8)];
        let rho: nd::Array2<C64> = sx();
        let cube: nd::Array3<C64> = nd::Array3::from_elem((2, 2, 2), c(1.0, -1.0));
        assert_eq!(op.call(&psi, 0.0, &ctx).unwrap(), psi);
        assert_eq!(op.call(&rho, 12.5, &ParamContext::new()).unwrap(), rho);
        assert_eq!(op.call(&cube, -1.0, &ctx).unwrap(), cube);
    }

    #[test]
    fn connected_is_input() {
        let op = DummyStateOperator::new();
        let found = op.connected(&[2, 0], &ParamContext::new()).unwrap();
        let expected: HashSet<usize> = [0, 2].into_iter().collect();
        assert_eq!(found, expected);
        assert_eq!(op.restrict(&[0]).unwrap(), op);
    }
}
