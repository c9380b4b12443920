//! Unitary evolution under a Hamiltonian.

use std::sync::Arc;
use ndarray as nd;
use num_complex::Complex64 as C64;
use rustc_hash::FxHashSet as HashSet;
use crate::{
    error::Result,
    operator::Operator,
    params::{ ParamContext, Parameters },
    stateops::{ StateOp, check_ensemble },
};

/// Effects Schrödinger evolution of a pure state, or von Neumann evolution of
/// a density matrix, under a Hamiltonian `H`.
#[allow(non_snake_case)]
#[derive(Clone, Debug)]
pub struct SchrodingerStateOperator {
    p: Arc<Parameters>,
    H: Operator,
    basis: Option<String>,
}

#[allow(non_snake_case)]
impl SchrodingerStateOperator {
    /// Create a new `SchrodingerStateOperator`.
    pub fn new(p: Arc<Parameters>, H: Operator) -> Self {
        let basis = H.basis().map(|b| b.name().to_string());
        Self { p, H, basis }
    }

    /// Get a reference to the Hamiltonian.
    pub fn hamiltonian(&self) -> &Operator { &self.H }
}

impl StateOp for SchrodingerStateOperator {
    fn name(&self) -> &'static str { "Schrodinger" }

    fn for_state(&self) -> bool { true }

    fn for_ensemble(&self) -> bool { true }

    fn basis(&self) -> Option<&str> { self.basis.as_deref() }

    /// `-i/ħ H ψ`
    fn act_pure(
        &self,
        psi: nd::ArrayView1<C64>,
        t: f64,
        params: &ParamContext,
    ) -> Result<nd::Array1<C64>>
    {
        let h_psi = self.H.apply(&self.p, psi, t, params)?;
        Ok(h_psi * (-C64::i() / self.p.c_hbar()))
    }

    /// `i/ħ [ρ, H]`
    fn act_ensemble(
        &self,
        rho: nd::ArrayView2<C64>,
        t: f64,
        params: &ParamContext,
    ) -> Result<nd::Array2<C64>>
    {
        check_ensemble(&rho, self.H.dim())?;
        let h = self.H.eval(&self.p, t, params)?;
        Ok((rho.dot(&h) - h.dot(&rho)) * (C64::i() / self.p.c_hbar()))
    }

    fn transform<F>(&self, f: F) -> Result<Self>
    where F: Fn(&Operator) -> Result<Operator>
    {
        Ok(Self::new(self.p.clone(), f(&self.H)?))
    }

    fn restrict(&self, indices: &[usize]) -> Result<Self> {
        Ok(Self::new(self.p.clone(), self.H.restrict(indices)?))
    }

    fn connected(&self, indices: &[usize], params: &ParamContext)
        -> Result<HashSet<usize>>
    {
        self.H.connected(&self.p, indices, params)
    }

    fn collapse(&self, wrt: &[&str], params: &ParamContext) -> Self {
        Self {
            p: self.p.clone(),
            H: self.H.collapse(&self.p, wrt, params),
            basis: self.basis.clone(),
        }
    }
}
