//! Definitions to describe bases and conversions between them.

use ndarray as nd;
use num_complex::Complex64 as C64;
use num_traits::{ One, Zero };
use crate::error::{ Error, Result };

const UNITARY_TOL: f64 = 1e-9;

/// Compute the outer product of two state vectors.
pub fn outer_prod(a: &nd::Array1<C64>, b: &nd::Array1<C64>)
    -> nd::Array2<C64>
{
    nd::Array2::from_shape_fn((a.len(), b.len()), |(i, j)| a[i] * b[j].conj())
}

/// Compute the conjugate transpose of a matrix.
pub fn dagger<S>(a: &nd::ArrayBase<S, nd::Ix2>) -> nd::Array2<C64>
where S: nd::Data<Elem = C64>
{
    a.t().mapv(|z| z.conj())
}

/// Get the `index`-th standard basis vector of a `dim`-dimensional space.
pub fn basis_vector(dim: usize, index: usize) -> Option<nd::Array1<C64>> {
    (index < dim).then(|| {
        (0..dim).map(|j| if j == index { C64::one() } else { C64::zero() })
            .collect()
    })
}

/// A named orthonormal basis.
///
/// The basis vectors are stored as the columns of a unitary matrix, expressed
/// in the standard (computational) basis of the system.
#[derive(Clone, Debug, PartialEq)]
pub struct Basis {
    name: String,
    vectors: nd::Array2<C64>,
}

impl Basis {
    /// Create the standard basis of a `dim`-dimensional space.
    pub fn standard<S: Into<String>>(name: S, dim: usize) -> Self {
        Self { name: name.into(), vectors: nd::Array2::eye(dim) }
    }

    /// Create a new basis from a matrix whose columns are the basis vectors.
    ///
    /// Fails if the matrix is not square and unitary.
    pub fn new<S: Into<String>>(name: S, vectors: nd::Array2<C64>)
        -> Result<Self>
    {
        let name = name.into();
        let (n, m) = vectors.dim();
        if n != m {
            return Err(Error::DimensionMismatch { expected: n, found: m });
        }
        let overlap = dagger(&vectors).dot(&vectors);
        let unitary
            = overlap.indexed_iter()
            .all(|((i, j), z)| {
                let target = if i == j { 1.0 } else { 0.0 };
                (*z - target).norm() < UNITARY_TOL
            });
        if !unitary { return Err(Error::NonUnitaryBasis(name)); }
        Ok(Self { name, vectors })
    }

    /// Get the name of the basis.
    pub fn name(&self) -> &str { &self.name }

    /// Get the dimension of the space spanned by the basis.
    pub fn dim(&self) -> usize { self.vectors.nrows() }

    /// Get the basis vectors as the columns of a matrix.
    pub fn vectors(&self) -> &nd::Array2<C64> { &self.vectors }

    /// Get the `index`-th basis vector in standard coordinates.
    pub fn vector(&self, index: usize) -> Option<nd::Array1<C64>> {
        (index < self.dim())
            .then(|| self.vectors.column(index).to_owned())
    }

    /// Compute the unitary taking coordinates relative to `self` to
    /// coordinates relative to `other`.
    pub fn transition_to(&self, other: &Basis) -> Result<nd::Array2<C64>> {
        if self.dim() != other.dim() {
            return Err(Error::DimensionMismatch {
                expected: self.dim(),
                found: other.dim(),
            });
        }
        Ok(dagger(&other.vectors).dot(&self.vectors))
    }

    /// Re-express a state vector given relative to `self` relative to
    /// `other`.
    pub fn convert_state(&self, state: &nd::Array1<C64>, other: &Basis)
        -> Result<nd::Array1<C64>>
    {
        if state.len() != self.dim() {
            return Err(Error::DimensionMismatch {
                expected: self.dim(),
                found: state.len(),
            });
        }
        if self == other { return Ok(state.clone()); }
        Ok(self.transition_to(other)?.dot(state))
    }

    /// Re-express a matrix given relative to `self` relative to `other`.
    pub fn convert_matrix(&self, matrix: &nd::Array2<C64>, other: &Basis)
        -> Result<nd::Array2<C64>>
    {
        if matrix.dim() != (self.dim(), self.dim()) {
            return Err(Error::DimensionMismatch {
                expected: self.dim(),
                found: matrix.nrows(),
            });
        }
        if self == other { return Ok(matrix.clone()); }
        let u = self.transition_to(other)?;
        Ok(u.dot(matrix).dot(&dagger(&u)))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn hadamard() -> Basis {
        let s = C64::from(std::f64::consts::FRAC_1_SQRT_2);
        Basis::new("x", nd::array![[s, s], [s, -s]]).unwrap()
    }

    #[test]
    fn rejects_non_unitary() {
        let m: nd::Array2<C64>
            = nd::array![[1.0, 1.0], [0.0, 1.0]].mapv(C64::from);
        assert!(matches!(Basis::new("bad", m), Err(Error::NonUnitaryBasis(_))));
    }

    #[test]
    fn state_conversion_roundtrip() {
        let z = Basis::standard("z", 2);
        let x = hadamard();
        let up = basis_vector(2, 0).unwrap();
        let up_x = z.convert_state(&up, &x).unwrap();
        let s = std::f64::consts::FRAC_1_SQRT_2;
        assert_abs_diff_eq!(up_x[0].re, s, epsilon = 1e-12);
        assert_abs_diff_eq!(up_x[1].re, s, epsilon = 1e-12);
        let back = x.convert_state(&up_x, &z).unwrap();
        let err: f64 = (&back - &up).mapv(|a| a.norm()).sum();
        assert_abs_diff_eq!(err, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn matrix_conversion_diagonalizes_sigma_x() {
        let z = Basis::standard("z", 2);
        let x = hadamard();
        let sx: nd::Array2<C64>
            = nd::array![[0.0, 1.0], [1.0, 0.0]].mapv(C64::from);
        let sx_x = z.convert_matrix(&sx, &x).unwrap();
        assert_abs_diff_eq!(sx_x[[0, 0]].re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sx_x[[1, 1]].re, -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sx_x[[0, 1]].norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn outer_prod_is_projector() {
        let v = basis_vector(3, 1).unwrap();
        let p = outer_prod(&v, &v);
        assert_eq!(p[[1, 1]], C64::one());
        assert_eq!(p.iter().filter(|z| !z.is_zero()).count(), 1);
    }
}
