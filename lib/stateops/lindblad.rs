//! Dissipative evolution from a single Lindblad jump operator.

use std::sync::Arc;
use ndarray as nd;
use num_complex::Complex64 as C64;
use rustc_hash::FxHashSet as HashSet;
use crate::{
    error::Result,
    hilbert::dagger,
    operator::Operator,
    params::{ ParamContext, Parameters, Scalar },
    stateops::{ StateOp, check_ensemble },
};

/// Effects a single-term Lindblad master equation
/// ```text
/// dρ/dt = γ(t) / ħ^2 (O ρ O† - {O† O, ρ} / 2)
/// ```
/// for a rate `γ` and jump operator `O`.
///
/// In a two-level system with `O = a |0⟩⟨1|`, the population of `|1⟩` decays
/// as `exp(-|a|^2 γ t / ħ^2)`. Only density matrices are supported.
#[derive(Clone, Debug)]
pub struct LindbladStateOperator {
    p: Arc<Parameters>,
    coefficient: Scalar,
    operator: Operator,
    basis: Option<String>,
}

impl LindbladStateOperator {
    /// Create a new `LindbladStateOperator`.
    pub fn new<C>(p: Arc<Parameters>, coefficient: C, operator: Operator)
        -> Self
    where C: Into<Scalar>
    {
        let basis = operator.basis().map(|b| b.name().to_string());
        Self { p, coefficient: coefficient.into(), operator, basis }
    }

    /// Get a reference to the rate coefficient.
    pub fn coefficient(&self) -> &Scalar { &self.coefficient }

    /// Get a reference to the jump operator.
    pub fn operator(&self) -> &Operator { &self.operator }

    fn rewrap(&self, operator: Operator) -> Self {
        Self::new(self.p.clone(), self.coefficient.clone(), operator)
    }
}

impl StateOp for LindbladStateOperator {
    fn name(&self) -> &'static str { "Lindblad" }

    fn for_state(&self) -> bool { false }

    fn for_ensemble(&self) -> bool { true }

    fn basis(&self) -> Option<&str> { self.basis.as_deref() }

    fn act_ensemble(
        &self,
        rho: nd::ArrayView2<C64>,
        t: f64,
        params: &ParamContext,
    ) -> Result<nd::Array2<C64>>
    {
        check_ensemble(&rho, self.operator.dim())?;
        let o = self.operator.eval(&self.p, t, params)?;
        let od = dagger(&o);
        let od_o = od.dot(&o);
        let rate = self.p.resolve(&self.coefficient, t, params)?;
        let scale = rate / self.p.c_hbar().powi(2);
        let jump = o.dot(&rho).dot(&od);
        let anti = od_o.dot(&rho) + rho.dot(&od_o);
        Ok((jump - anti * 0.5) * scale)
    }

    fn transform<F>(&self, f: F) -> Result<Self>
    where F: Fn(&Operator) -> Result<Operator>
    {
        Ok(self.rewrap(f(&self.operator)?))
    }

    fn restrict(&self, indices: &[usize]) -> Result<Self> {
        let mut restricted = self.rewrap(self.operator.restrict(indices)?);
        restricted.basis = None;
        Ok(restricted)
    }

    fn connected(&self, indices: &[usize], params: &ParamContext)
        -> Result<HashSet<usize>>
    {
        self.operator.connected(&self.p, indices, params)
    }

    fn collapse(&self, wrt: &[&str], params: &ParamContext) -> Self {
        Self {
            p: self.p.clone(),
            coefficient: self.coefficient.clone(),
            operator: self.operator.collapse(&self.p, wrt, params),
            basis: self.basis.clone(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::{
        hilbert::Basis,
        stateops::test_utils::*,
    };

    fn excited() -> nd::Array2<C64> {
        nd::array![[0.0, 0.0], [0.0, 1.0]].mapv(C64::from)
    }

    #[test]
    fn excited_population_rate() {
        let p = Arc::new(Parameters::new(2.0));
        let op = LindbladStateOperator::new(
            p,
            "gamma",
            Operator::from_matrix(lowering(8.0_f64.sqrt())).unwrap(),
        );
        let ctx = ParamContext::new().with("gamma", 0.5);
        let drho = op.call(&excited(), 0.0, &ctx).unwrap();
        // |a|^2 γ / ħ^2 = 8 * 0.5 / 4
        assert_abs_diff_eq!(drho[[1, 1]].re, -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(drho[[0, 0]].re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(drho[[0, 1]].norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn trace_preserving() {
        let p = Arc::new(Parameters::default());
        let o = Operator::from_matrix(sx() + lowering(0.3)).unwrap();
        let op = LindbladStateOperator::new(
            p, Scalar::from_fn(|t, _| 1.0 + t), o);
        let rho: nd::Array2<C64>
            = nd::array![[c(0.3, 0.0), c(0.1, 0.2)], [c(0.1, -0.2), c(0.7, 0.0)]];
        let drho = op.call(&rho, 1.5, &ParamContext::new()).unwrap();
        let tr: C64 = drho.diag().sum();
        assert_abs_diff_eq!(tr.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn restrict_drops_basis_but_collapse_keeps_it() {
        let p = Arc::new(Parameters::default());
        let o
            = Operator::from_matrix(lowering(1.0)).unwrap()
            .in_basis(Basis::standard("z", 2)).unwrap();
        let op = LindbladStateOperator::new(p, 1.0, o);
        assert_eq!(op.basis(), Some("z"));
        assert_eq!(op.collapse(&[], &ParamContext::new()).basis(), Some("z"));
        let r = op.restrict(&[0, 1]).unwrap();
        assert_eq!(r.basis(), None);
        assert_eq!(op.basis(), Some("z"));
        let expected: HashSet<usize> = [0, 1].into_iter().collect();
        assert_eq!(r.connected(&[1], &ParamContext::new()).unwrap(), expected);
    }
}
