//! Adiabatic labelling of eigenvalues along a parameter sweep.
//!
//! Each tracked state is assigned the eigenvalue slot (position in the
//! ascending-sorted spectrum) of the eigenvector it overlaps with most at the
//! initial parameter point. That slot is then read out at every point of the
//! sweep. Slots are never re-tracked, so if two levels cross along the sweep
//! their trajectories swap labels without notice; sweeps must avoid
//! crossings.

use indexmap::IndexMap;
use itertools::Itertools;
use ndarray as nd;
use ndarray_linalg::{ self as la, Eigh, EigValsh };
use num_complex::Complex64 as C64;
use rayon::iter::{ IntoParallelIterator, ParallelIterator };
use rustc_hash::FxHashSet as HashSet;
use tracing::{ debug, warn };
use crate::{
    error::{ Error, Result },
    operator::Operator,
    params::{ ParamContext, Parameters, Ranges },
    system::QuantumSystem,
};

/// Options for [`energy_spectrum`].
///
/// The Hamiltonian swept over is `hamiltonian` if given, else the sum of
/// `components` (all of the system's components if empty). The Hamiltonian
/// used to label states falls back to `hamiltonian_init`, then
/// `components_init`, then the swept Hamiltonian.
#[derive(Clone, Debug, Default)]
pub struct SpectrumOptions {
    /// Basis the tracked states are given in; `None` for the system default.
    pub input: Option<String>,
    /// Basis the Hamiltonians are diagonalized in; `None` for the system
    /// default.
    pub output: Option<String>,
    pub hamiltonian: Option<Operator>,
    pub components: Vec<String>,
    /// Fixed parameter values, overridden by the sweep.
    pub params: ParamContext,
    pub hamiltonian_init: Option<Operator>,
    pub components_init: Option<Vec<String>>,
    /// Parameter values at which states are labelled; defaults to `params`.
    pub params_init: Option<ParamContext>,
    /// Also output the eigenvalues of every untracked slot.
    pub complete: bool,
    /// Diagonalize sweep points in parallel.
    pub parallel: bool,
}

impl SpectrumOptions {
    pub fn new() -> Self { Self::default() }

    pub fn input<S: Into<String>>(mut self, basis: S) -> Self {
        self.input = Some(basis.into());
        self
    }

    pub fn output<S: Into<String>>(mut self, basis: S) -> Self {
        self.output = Some(basis.into());
        self
    }

    pub fn hamiltonian(mut self, hamiltonian: Operator) -> Self {
        self.hamiltonian = Some(hamiltonian);
        self
    }

    pub fn components<I, S>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.components = components.into_iter().map(|s| s.into()).collect();
        self
    }

    pub fn params(mut self, params: ParamContext) -> Self {
        self.params = params;
        self
    }

    pub fn hamiltonian_init(mut self, hamiltonian: Operator) -> Self {
        self.hamiltonian_init = Some(hamiltonian);
        self
    }

    pub fn components_init<I, S>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.components_init
            = Some(components.into_iter().map(|s| s.into()).collect());
        self
    }

    pub fn params_init(mut self, params: ParamContext) -> Self {
        self.params_init = Some(params);
        self
    }

    pub fn complete(mut self, complete: bool) -> Self {
        self.complete = complete;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Non-fatal conditions encountered by [`energy_spectrum`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SpectrumWarning {
    /// Two or more tracked states were assigned the same eigenvalue slot.
    #[error("multiple tracked states assigned to eigenvalue slot(s) {slots:?}")]
    NonBijectiveLabelling { slots: Vec<usize> },
}

/// Assignment of tracked states to eigenvalue slots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Labelling {
    /// Slot of each tracked state, in input order.
    pub slots: Vec<usize>,
    /// Slots assigned to more than one tracked state, in increasing order.
    pub shared: Vec<usize>,
}

impl Labelling {
    /// Label `states` by maximum overlap magnitude with the eigenvectors of
    /// `h`, sorted by ascending eigenvalue. Ties go to the lowest slot.
    pub fn compute(
        h: &Operator,
        p: &Parameters,
        states: &[nd::Array1<C64>],
        params: &ParamContext,
    ) -> Result<Self>
    {
        let dim = h.dim();
        let (_, vectors) = sorted_eigh(&h.eval(p, params.time(), params)?)?;
        let slots: Vec<usize>
            = states.iter()
            .map(|psi| {
                if psi.len() != dim {
                    return Err(Error::DimensionMismatch {
                        expected: dim,
                        found: psi.len(),
                    });
                }
                Ok(max_overlap(&vectors, psi))
            })
            .collect::<Result<_>>()?;
        let shared: Vec<usize>
            = slots.iter()
            .duplicates()
            .copied()
            .sorted_unstable()
            .collect();
        Ok(Self { slots, shared })
    }

    /// Return `true` if no two tracked states share a slot.
    pub fn is_bijective(&self) -> bool { self.shared.is_empty() }

    /// Slots of a `dim`-dimensional spectrum assigned to no tracked state, in
    /// increasing order.
    pub fn untracked(&self, dim: usize) -> Vec<usize> {
        let tracked: HashSet<usize> = self.slots.iter().copied().collect();
        (0..dim).filter(|k| !tracked.contains(k)).collect()
    }
}

/// Output of [`energy_spectrum`].
#[derive(Clone, Debug)]
pub struct Spectrum {
    /// Eigenvalue trajectories; row `i` follows tracked state `i` and, in
    /// complete mode, trailing rows follow the untracked slots in increasing
    /// order. The second index runs over sweep points.
    pub values: nd::Array2<f64>,
    /// Expanded sweep values.
    pub sweep: IndexMap<String, Vec<f64>>,
    pub labelling: Labelling,
    pub warnings: Vec<SpectrumWarning>,
}

fn sorted_eigh(h: &nd::Array2<C64>)
    -> Result<(nd::Array1<f64>, nd::Array2<C64>)>
{
    let (e, v): (nd::Array1<f64>, nd::Array2<C64>) = h.eigh(la::UPLO::Lower)?;
    let order: Vec<usize>
        = (0..e.len()).sorted_by(|&a, &b| e[a].total_cmp(&e[b])).collect();
    Ok((e.select(nd::Axis(0), &order), v.select(nd::Axis(1), &order)))
}

fn sorted_eigvalsh(h: &nd::Array2<C64>) -> Result<Vec<f64>> {
    let mut e: Vec<f64> = h.eigvalsh(la::UPLO::Lower)?.to_vec();
    e.sort_by(f64::total_cmp);
    Ok(e)
}

// first index of the maximum |<v_k|psi>|
fn max_overlap(vectors: &nd::Array2<C64>, psi: &nd::Array1<C64>) -> usize {
    vectors.axis_iter(nd::Axis(1))
        .map(|v| {
            v.iter().zip(psi)
                .map(|(vk, pk)| vk.conj() * pk)
                .sum::<C64>()
                .norm()
        })
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(k_max, x_max), (k, x)| {
            if x > x_max { (k, x) } else { (k_max, x_max) }
        })
        .0
}

fn resolve_hamiltonian<Q>(
    system: &Q,
    hamiltonian: Option<&Operator>,
    components: &[String],
) -> Result<Operator>
where Q: QuantumSystem + ?Sized
{
    match hamiltonian {
        Some(h) => Ok(h.clone()),
        None => {
            let names: Vec<&str>
                = components.iter().map(|s| s.as_str()).collect();
            system.H(&names)
        },
    }
}

/// Compute the eigenvalue each of `states` adiabatically follows over a sweep
/// of `ranges`.
///
/// `ranges` must be a single mapping from parameter names to ranges, all
/// expanding to the same length; anything else fails with
/// [`Error::InvalidRangeSpec`] before any diagonalization. A labelling that
/// assigns several states to one slot is reported as a warning in the
/// returned [`Spectrum`] and tracking proceeds.
pub fn energy_spectrum<Q>(
    system: &Q,
    states: &[nd::Array1<C64>],
    ranges: &Ranges,
    opts: &SpectrumOptions,
) -> Result<Spectrum>
where Q: QuantumSystem + ?Sized
{
    let ranges = ranges.as_single()?;
    let p = system.p();
    let sweep = p.range(ranges, &opts.params)?;
    let num_points = sweep.values().next().map(|v| v.len()).unwrap_or(0);

    let output = system.basis(opts.output.as_deref())?;
    let params_init = opts.params_init.as_ref().unwrap_or(&opts.params);
    let h_init
        = match (&opts.hamiltonian_init, &opts.components_init) {
            (Some(h), _) => h.clone(),
            (None, Some(components)) => {
                resolve_hamiltonian(system, None, components)?
            },
            (None, None) => resolve_hamiltonian(
                system, opts.hamiltonian.as_ref(), &opts.components)?,
        }
        .change_basis(&output)?;
    let states = system.subspace(
        states, opts.input.as_deref(), opts.output.as_deref(), &opts.params)?;
    let labelling = Labelling::compute(&h_init, p, &states, params_init)?;
    debug!(
        tracked = labelling.slots.len(),
        slots = ?labelling.slots,
        "labelled initial states"
    );
    let mut warnings: Vec<SpectrumWarning> = Vec::new();
    if !labelling.is_bijective() {
        warn!(
            slots = ?labelling.shared,
            "multiple tracked states share an eigenvalue slot; \
            consider choosing different initial states"
        );
        warnings.push(SpectrumWarning::NonBijectiveLabelling {
            slots: labelling.shared.clone(),
        });
    }

    let h = resolve_hamiltonian(
        system, opts.hamiltonian.as_ref(), &opts.components)?
        .change_basis(&output)?;
    let mut rows: Vec<usize> = labelling.slots.clone();
    if opts.complete {
        rows.append(&mut labelling.untracked(h.dim()));
    }
    debug!(
        rows = rows.len(),
        points = num_points,
        parallel = opts.parallel,
        "sweeping spectrum"
    );
    let column = |k: usize| -> Result<Vec<f64>> {
        let mut point = opts.params.clone();
        for (name, values) in sweep.iter() {
            point.insert(name.clone(), values[k]);
        }
        let e = sorted_eigvalsh(&h.eval(p, point.time(), &point)?)?;
        Ok(rows.iter().map(|slot| e[*slot]).collect())
    };
    let columns: Vec<Vec<f64>>
        = if opts.parallel {
            (0..num_points).into_par_iter()
                .map(column)
                .collect::<Result<_>>()?
        } else {
            (0..num_points).map(column).collect::<Result<_>>()?
        };

    let mut values: nd::Array2<f64>
        = nd::Array2::zeros((rows.len(), num_points));
    let iter = columns.iter().zip(values.axis_iter_mut(nd::Axis(1)));
    for (col, mut target) in iter {
        target.iter_mut().zip(col).for_each(|(t, e)| { *t = *e; });
    }
    Ok(Spectrum { values, sweep, labelling, warnings })
}

#[cfg(test)]
mod test {
    use approx::assert_abs_diff_eq;
    use super::*;
    use crate::{
        hilbert::{ Basis, dagger },
        params::RangeSpec,
        system::System,
    };

    const PHI: f64 = 0.4;

    fn c(re: f64, im: f64) -> C64 { C64::new(re, im) }

    fn rotation() -> nd::Array2<C64> {
        nd::array![[PHI.cos(), -PHI.sin()], [PHI.sin(), PHI.cos()]]
            .mapv(C64::from)
    }

    // H(θ) = θ R diag(1, -1) R†
    fn rotated_system() -> System {
        let r = rotation();
        let d = nd::array![[1.0, 0.0], [0.0, -1.0]].mapv(C64::from);
        let h = Operator::zeros(2)
            .with_term("theta", r.dot(&d).dot(&dagger(&r)))
            .unwrap();
        System::new(Parameters::default(), 2)
            .with_component("rot", h).unwrap()
    }

    fn theta_sweep() -> Ranges {
        [("theta", RangeSpec::linear(0.5, 2.0, 16))].into_iter().collect()
    }

    fn rotated_states() -> Vec<nd::Array1<C64>> {
        let r = rotation();
        vec![r.column(0).to_owned(), r.column(1).to_owned()]
    }

    fn rotated_opts() -> SpectrumOptions {
        SpectrumOptions::new()
            .params(ParamContext::new().with("theta", 0.5))
    }

    #[test]
    fn tracks_rotated_diagonal_family() {
        let sys = rotated_system();
        let spec = energy_spectrum(
            &sys, &rotated_states(), &theta_sweep(), &rotated_opts()).unwrap();
        assert_eq!(spec.labelling.slots, vec![1, 0]);
        assert!(spec.warnings.is_empty());
        assert_eq!(spec.values.dim(), (2, 16));
        for (k, theta) in spec.sweep["theta"].iter().enumerate() {
            assert_abs_diff_eq!(spec.values[[0, k]], *theta, epsilon = 1e-12);
            assert_abs_diff_eq!(spec.values[[1, k]], -*theta, epsilon = 1e-12);
        }
    }

    #[test]
    fn labelling_ignores_global_phase() {
        let sys = rotated_system();
        let phased: Vec<nd::Array1<C64>>
            = rotated_states().into_iter()
            .zip([c(0.7_f64.cos(), 0.7_f64.sin()), c(0.0, -1.0)])
            .map(|(psi, phase)| psi * phase)
            .collect();
        let plain = energy_spectrum(
            &sys, &rotated_states(), &theta_sweep(), &rotated_opts()).unwrap();
        let spec = energy_spectrum(
            &sys, &phased, &theta_sweep(), &rotated_opts()).unwrap();
        assert_eq!(spec.labelling, plain.labelling);
        assert_eq!(spec.values, plain.values);
    }

    #[test]
    fn complete_mode_covers_spectrum() {
        let diag = nd::Array2::from_diag(&nd::array![1.0, 2.0, 3.0])
            .mapv(C64::from);
        let coupling
            = nd::array![[0.0, 0.3, 0.0], [0.3, 0.0, 0.3], [0.0, 0.3, 0.0]]
            .mapv(C64::from);
        let sys = System::new(Parameters::default(), 3)
            .with_component(
                "diag", Operator::zeros(3).with_term("a", diag).unwrap())
            .unwrap()
            .with_component("coupling", Operator::from_matrix(coupling).unwrap())
            .unwrap();
        let ranges: Ranges
            = [("a", RangeSpec::linear(1.0, 3.0, 5))].into_iter().collect();
        let opts = SpectrumOptions::new()
            .params(ParamContext::new().with("a", 1.0))
            .complete(true);
        let states = vec![nd::array![c(0.0, 0.0), c(0.0, 0.0), c(1.0, 0.0)]];
        let spec = energy_spectrum(&sys, &states, &ranges, &opts).unwrap();
        assert_eq!(spec.values.dim(), (3, 5));
        assert_eq!(spec.labelling.slots, vec![2]);
        let h = sys.H(&[]).unwrap();
        for (k, a) in spec.sweep["a"].iter().enumerate() {
            let point = ParamContext::new().with("a", *a);
            let expected
                = sorted_eigvalsh(&h.eval(sys.p(), 0.0, &point).unwrap())
                .unwrap();
            let mut found: Vec<f64> = spec.values.column(k).to_vec();
            found.sort_by(f64::total_cmp);
            for (x, y) in found.iter().zip(&expected) {
                assert_abs_diff_eq!(*x, *y, epsilon = 1e-10);
            }
            assert_abs_diff_eq!(spec.values[[0, k]], expected[2], epsilon = 1e-10);
        }
    }

    #[test]
    fn equal_overlap_goes_to_first_slot() {
        let vectors: nd::Array2<C64> = nd::Array2::eye(3);
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let psi = nd::array![c(0.0, 0.0), c(s, 0.0), c(0.0, s)];
        assert_eq!(max_overlap(&vectors, &psi), 1);

        let sz = nd::array![[1.0, 0.0], [0.0, -1.0]].mapv(C64::from);
        let sys = System::new(Parameters::default(), 2)
            .with_component("z", Operator::zeros(2).with_term("theta", sz).unwrap())
            .unwrap();
        let states = vec![nd::array![c(s, 0.0), c(s, 0.0)]];
        let spec = energy_spectrum(
            &sys, &states, &theta_sweep(), &rotated_opts()).unwrap();
        assert_eq!(spec.labelling.slots, vec![0]);
        for (k, theta) in spec.sweep["theta"].iter().enumerate() {
            assert_abs_diff_eq!(spec.values[[0, k]], -*theta, epsilon = 1e-12);
        }
    }

    #[test]
    fn multi_ranges_rejected_before_diagonalization() {
        let sys = rotated_system();
        let opts = SpectrumOptions::new().components(["missing"]);
        let multi = Ranges::Multi(vec![
            [("theta".to_string(), RangeSpec::values([1.0, 2.0]))]
                .into_iter().collect(),
        ]);
        assert!(matches!(
            energy_spectrum(&sys, &rotated_states(), &multi, &opts),
            Err(Error::InvalidRangeSpec(_))
        ));
        assert!(matches!(
            energy_spectrum(&sys, &rotated_states(), &theta_sweep(), &opts),
            Err(Error::UnknownComponent(_))
        ));
    }

    #[test]
    fn non_bijective_labelling_warns() {
        let sz = nd::array![[1.0, 0.0], [0.0, -1.0]].mapv(C64::from);
        let sys = System::new(Parameters::default(), 2)
            .with_component("z", Operator::zeros(2).with_term("theta", sz).unwrap())
            .unwrap();
        let n = (0.9_f64.powi(2) + 0.1_f64.powi(2)).sqrt();
        let states = vec![
            nd::array![c(1.0, 0.0), c(0.0, 0.0)],
            nd::array![c(0.9 / n, 0.0), c(0.1 / n, 0.0)],
        ];
        let opts = rotated_opts().complete(true);
        let spec = energy_spectrum(&sys, &states, &theta_sweep(), &opts).unwrap();
        assert_eq!(spec.labelling.slots, vec![1, 1]);
        assert!(!spec.labelling.is_bijective());
        assert_eq!(
            spec.warnings,
            vec![SpectrumWarning::NonBijectiveLabelling { slots: vec![1] }],
        );
        assert_eq!(spec.values.dim(), (3, 16));
        for (k, theta) in spec.sweep["theta"].iter().enumerate() {
            assert_abs_diff_eq!(spec.values[[0, k]], *theta, epsilon = 1e-12);
            assert_abs_diff_eq!(spec.values[[1, k]], *theta, epsilon = 1e-12);
            assert_abs_diff_eq!(spec.values[[2, k]], -*theta, epsilon = 1e-12);
        }
    }

    #[test]
    fn states_converted_from_input_basis() {
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let x = Basis::new("x", nd::array![[s, s], [s, -s]].mapv(C64::from))
            .unwrap();
        let sx = nd::array![[0.0, 1.0], [1.0, 0.0]].mapv(C64::from);
        let sys = System::new(Parameters::default(), 2)
            .with_component("x", Operator::zeros(2).with_term("theta", sx).unwrap())
            .unwrap()
            .with_basis(x).unwrap();
        // |+> in the x basis
        let states = vec![nd::array![c(1.0, 0.0), c(0.0, 0.0)]];
        let opts = rotated_opts().input("x");
        let spec = energy_spectrum(&sys, &states, &theta_sweep(), &opts).unwrap();
        assert_eq!(spec.labelling.slots, vec![1]);
        assert_abs_diff_eq!(spec.values[[0, 15]], 2.0, epsilon = 1e-12);
    }

    // reverses the components of converted states when `swap` is set
    struct SwappingSystem(System);

    impl QuantumSystem for SwappingSystem {
        fn dim(&self) -> usize { self.0.dim() }

        fn p(&self) -> &Parameters { self.0.p() }

        fn H(&self, components: &[&str]) -> Result<Operator> {
            self.0.H(components)
        }

        fn basis(&self, name: Option<&str>) -> Result<Basis> {
            self.0.basis(name)
        }

        fn subspace(
            &self,
            states: &[nd::Array1<C64>],
            input: Option<&str>,
            output: Option<&str>,
            params: &ParamContext,
        ) -> Result<Vec<nd::Array1<C64>>>
        {
            let states = self.0.subspace(states, input, output, params)?;
            if params.get("swap").is_some_and(|x| *x != 0.0) {
                Ok(
                    states.into_iter()
                        .map(|s| s.slice(nd::s![..;-1]).to_owned())
                        .collect()
                )
            } else {
                Ok(states)
            }
        }
    }

    #[test]
    fn states_converted_under_sweep_params() {
        let sz = nd::array![[1.0, 0.0], [0.0, -1.0]].mapv(C64::from);
        let sys = SwappingSystem(
            System::new(Parameters::default(), 2)
                .with_component(
                    "z", Operator::zeros(2).with_term("theta", sz).unwrap())
                .unwrap()
        );
        let states = vec![nd::array![c(1.0, 0.0), c(0.0, 0.0)]];
        let opts = SpectrumOptions::new()
            .params(ParamContext::new().with("theta", 0.5).with("swap", 1.0))
            .params_init(ParamContext::new().with("theta", 0.5));
        let spec = energy_spectrum(&sys, &states, &theta_sweep(), &opts).unwrap();
        assert_eq!(spec.labelling.slots, vec![0]);
        for (k, theta) in spec.sweep["theta"].iter().enumerate() {
            assert_abs_diff_eq!(spec.values[[0, k]], -*theta, epsilon = 1e-12);
        }
    }

    #[test]
    fn parallel_matches_sequential() {
        let sys = rotated_system();
        let opts = rotated_opts().complete(true);
        let seq = energy_spectrum(
            &sys, &rotated_states()[..1], &theta_sweep(), &opts).unwrap();
        let par = energy_spectrum(
            &sys, &rotated_states()[..1], &theta_sweep(), &opts.parallel(true))
            .unwrap();
        assert_eq!(seq.values, par.values);
        assert_eq!(seq.values.dim(), (2, 16));
    }
}
