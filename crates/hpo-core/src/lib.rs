//! Spectral correspondence between a discretized Schrödinger-type operator
//! and the ordinates of the Riemann zeta zeros.

pub mod common;
pub mod domain;
pub mod modules;
pub mod numerics;
