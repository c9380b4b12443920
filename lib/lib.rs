#![allow(non_snake_case)]

//! Adiabatic spectrum tracking and state-evolution operators for few-level
//! quantum systems.

pub mod error;
pub mod params;
pub mod hilbert;
pub mod operator;
pub mod system;
pub mod stateops;
pub mod evolve;
pub mod spectrum;

pub use error::{ Error, Result };
pub use params::{ ParamContext, Parameters, RangeSpec, Ranges, Scalar };
pub use hilbert::Basis;
pub use operator::Operator;
pub use system::{ QuantumSystem, System };
pub use stateops::{
    DummyStateOperator,
    LindbladStateOperator,
    SchrodingerStateOperator,
    StateOp,
    StateOperator,
};
pub use evolve::{ Evolution, Stepper, Trajectory };
pub use spectrum::{
    Labelling,
    Spectrum,
    SpectrumOptions,
    SpectrumWarning,
    energy_spectrum,
};
