//! 2x2 unitary arithmetic for single-qubit gate fusion.

use num_complex::Complex64;
use std::f64::consts::PI;

/// Tolerance for matrix-element comparisons.
pub const MATRIX_EPSILON: f64 = 1e-10;

/// A 2x2 unitary in row-major order.
#[derive(Debug, Clone, Copy)]
pub struct Unitary2x2 {
    /// Elements `[[a, b], [c, d]]`.
    pub data: [Complex64; 4],
}

impl Unitary2x2 {
    pub fn new(a: Complex64, b: Complex64, c: Complex64, d: Complex64) -> Self {
        Self { data: [a, b, c, d] }
    }

    pub fn identity() -> Self {
        Self::new(
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(1.0, 0.0),
        )
    }

    /// u3(θ, φ, λ), the general single-qubit gate.
    pub fn u3(theta: f64, phi: f64, lambda: f64) -> Self {
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        Self::new(
            Complex64::new(c, 0.0),
            -Complex64::from_polar(s, lambda),
            Complex64::from_polar(s, phi),
            Complex64::from_polar(c, phi + lambda),
        )
    }

    /// u2(φ, λ) = u3(π/2, φ, λ).
    pub fn u2(phi: f64, lambda: f64) -> Self {
        Self::u3(PI / 2.0, phi, lambda)
    }

    /// u1(λ) = diag(1, e^{iλ}).
    pub fn u1(lambda: f64) -> Self {
        Self::new(
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::from_polar(1.0, lambda),
        )
    }

    pub fn rz(theta: f64) -> Self {
        Self::new(
            Complex64::from_polar(1.0, -theta / 2.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::from_polar(1.0, theta / 2.0),
        )
    }

    pub fn ry(theta: f64) -> Self {
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        Self::new(
            Complex64::new(c, 0.0),
            Complex64::new(-s, 0.0),
            Complex64::new(s, 0.0),
            Complex64::new(c, 0.0),
        )
    }

    /// Matrix product `self * other` (other applied first).
    #[allow(clippy::many_single_char_names)]
    pub fn mul(&self, other: &Self) -> Self {
        let [a, b, c, d] = self.data;
        let [e, f, g, h] = other.data;
        Self::new(a * e + b * g, a * f + b * h, c * e + d * g, c * f + d * h)
    }

    /// Whether off-diagonal elements vanish.
    pub fn is_diagonal(&self) -> bool {
        self.data[1].norm() < MATRIX_EPSILON && self.data[2].norm() < MATRIX_EPSILON
    }

    /// Whether this equals the identity up to a global phase.
    pub fn is_identity_up_to_phase(&self) -> bool {
        self.is_diagonal() && (self.data[0] - self.data[3]).norm() < MATRIX_EPSILON
    }

    /// ZYZ Euler angles: `U = phase * Rz(alpha) * Ry(beta) * Rz(gamma)`.
    ///
    /// Returns `(alpha, beta, gamma, phase)`.
    pub fn zyz_decomposition(&self) -> (f64, f64, f64, f64) {
        let [a, b, c, d] = self.data;

        let det = a * d - b * c;
        let global_phase = det.arg() / 2.0;

        // Normalize to SU(2) before reading angles off the elements.
        let phase_factor = Complex64::from_polar(1.0, -global_phase);
        let a = a * phase_factor;
        let b = b * phase_factor;
        let c = c * phase_factor;

        let beta = 2.0 * a.norm().clamp(0.0, 1.0).acos();

        if beta.abs() < MATRIX_EPSILON {
            // Pure Z rotation.
            let alpha_plus_gamma = -2.0 * a.arg();
            return (
                alpha_plus_gamma / 2.0,
                0.0,
                alpha_plus_gamma / 2.0,
                global_phase,
            );
        }

        if (beta - PI).abs() < MATRIX_EPSILON {
            let alpha_minus_gamma = -2.0 * (-b).arg();
            return (
                alpha_minus_gamma / 2.0,
                PI,
                -alpha_minus_gamma / 2.0,
                global_phase,
            );
        }

        // a = cos(beta/2) e^{-i(alpha+gamma)/2}, c = sin(beta/2) e^{i(alpha-gamma)/2}
        let alpha_plus_gamma = -2.0 * a.arg();
        let alpha_minus_gamma = 2.0 * c.arg();

        let alpha = (alpha_plus_gamma + alpha_minus_gamma) / 2.0;
        let gamma = (alpha_plus_gamma - alpha_minus_gamma) / 2.0;

        (alpha, beta, gamma, global_phase)
    }

    /// Fold an angle into `(-pi, pi]`.
    pub fn normalize_angle(angle: f64) -> f64 {
        if !angle.is_finite() {
            return 0.0;
        }
        let mut a = angle.rem_euclid(2.0 * PI);
        if a > PI {
            a -= 2.0 * PI;
        }
        a
    }
}

impl Default for Unitary2x2 {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::ops::Mul for Unitary2x2 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Unitary2x2::mul(&self, &rhs)
    }
}
