//! # Interpolating Splines
//!
//! This module fits the smooth curve every other analysis step works from.
//! Given sample instants (seconds since the epoch) and heights, it builds the
//! unique spline of degree `k` that passes through every sample, then stores
//! it in piecewise-polynomial form so evaluation, differentiation and root
//! finding are all cheap and exact.
//!
//! ## Construction
//!
//! ### Knot Layout
//! The knot vector follows the classic zero-smoothing layout:
//! - `k + 1` coincident knots at the first and last sample
//! - **odd `k`**: interior knots on the samples `x[i + (k+1)/2]`
//! - **even `k`**: interior knots halfway between samples
//!
//! For `k = 3` this is the familiar "not-a-knot" cubic.
//!
//! ### Solving
//! Each sample contributes one row of at most `k + 1` non-zero B-spline
//! basis values, so the collocation system is banded. The matrix is totally
//! positive, which makes Gaussian elimination without pivoting stable; the
//! whole solve is `O(n·k²)`.
//!
//! ### Piecewise Form
//! After solving, each knot interval is expanded into a Taylor polynomial at
//! its left end. The derivative is then the term-wise derivative (degree drops
//! by one) and evaluation is a single Horner pass.
//!
//! ## Root Finding
//! The domain is cut at every breakpoint and at every critical point of each
//! polynomial piece, so the spline is monotone between consecutive cuts. A
//! sign change between two cuts therefore brackets exactly one root, which is
//! refined by bisection. The number of bisection steps is capped, so the cost
//! stays proportional to the number of pieces.

/// Upper bound on bisection steps for one bracketed root.
///
/// Halving any finite `f64` interval reaches adjacent floats well before this.
const MAX_BISECTIONS: usize = 200;

/// Roots closer than this (in seconds) are reported once.
const ROOT_MERGE_SECS: f64 = 1e-6;

/// A spline in piecewise-polynomial form.
///
/// Abscissae are stored relative to `origin` (the first fitted sample) to keep
/// the polynomial coefficients well conditioned; the public API always speaks
/// absolute epoch seconds.
#[derive(Clone, Debug, PartialEq)]
pub struct Spline {
    origin: f64,
    /// Piece boundaries relative to `origin`, strictly increasing
    breaks: Vec<f64>,
    /// `degree + 1` Taylor coefficients per piece, ascending powers
    coeffs: Vec<f64>,
    degree: usize,
}

impl Spline {
    /// Fit the interpolating spline of degree `min(k, n - 1)` through
    /// `(x[i], y[i])`.
    ///
    /// Returns `None` when fewer than two points are given, when the inputs
    /// differ in length, when `k` is zero, or when `x` is not strictly
    /// increasing and finite.
    ///
    /// # Example
    /// ```
    /// use tide_windows_lib::spline::Spline;
    ///
    /// let x = [0.0, 1.0, 2.0, 3.0, 4.0];
    /// let y = [0.0, 1.0, 4.0, 9.0, 16.0];
    /// let f = Spline::interpolate(&x, &y, 3).unwrap();
    ///
    /// assert!((f.eval(2.5) - 6.25).abs() < 1e-9);
    /// assert!((f.derivative().eval(2.5) - 5.0).abs() < 1e-9);
    /// ```
    pub fn interpolate(x: &[f64], y: &[f64], k: usize) -> Option<Spline> {
        let n = x.len();
        if n < 2 || y.len() != n || k == 0 {
            return None;
        }
        if x.iter().chain(y).any(|v| !v.is_finite()) || x.windows(2).any(|w| w[1] <= w[0]) {
            return None;
        }

        let k = k.min(n - 1);
        let origin = x[0];
        let xs: Vec<f64> = x.iter().map(|v| v - origin).collect();

        let knots = interpolation_knots(&xs, k);
        let bspline = solve_collocation(&xs, y, &knots, k)?;

        Some(Self::from_bspline(origin, &knots, &bspline, k))
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Evaluate at `x` (epoch seconds).
    ///
    /// Outside the fitted domain the boundary piece is extended, so lookups a
    /// few minutes past either end still return a sensible value.
    pub fn eval(&self, x: f64) -> f64 {
        self.eval_relative(x - self.origin)
    }

    /// The first derivative, one degree lower.
    pub fn derivative(&self) -> Spline {
        if self.degree == 0 {
            return Spline {
                coeffs: vec![0.0; self.pieces()],
                ..self.clone()
            };
        }

        let coeffs = self
            .coeffs
            .chunks(self.degree + 1)
            .flat_map(poly_derivative)
            .collect();

        Spline {
            origin: self.origin,
            breaks: self.breaks.clone(),
            coeffs,
            degree: self.degree - 1,
        }
    }

    /// All real roots inside the fitted domain, ascending, in epoch seconds.
    pub fn roots(&self) -> Vec<f64> {
        let mut cuts = self.breaks.clone();
        for (i, bounds) in self.breaks.windows(2).enumerate() {
            let slope = poly_derivative(self.piece(i));
            let width = bounds[1] - bounds[0];
            cuts.extend(
                poly_roots(&slope, 0.0, width)
                    .into_iter()
                    .map(|c| bounds[0] + c),
            );
        }
        cuts.sort_by(f64::total_cmp);
        cuts.dedup();

        bracket_roots(|u| self.eval_relative(u), &cuts)
            .into_iter()
            .map(|r| r + self.origin)
            .collect()
    }

    fn pieces(&self) -> usize {
        self.breaks.len() - 1
    }

    fn piece(&self, index: usize) -> &[f64] {
        let width = self.degree + 1;
        &self.coeffs[index * width..(index + 1) * width]
    }

    fn eval_relative(&self, u: f64) -> f64 {
        let interior = &self.breaks[1..self.pieces()];
        let index = interior.partition_point(|b| *b <= u);
        horner(self.piece(index), u - self.breaks[index])
    }

    /// Expand a B-spline (knots `t`, coefficients `c`, degree `k`) into
    /// Taylor pieces.
    fn from_bspline(origin: f64, t: &[f64], c: &[f64], k: usize) -> Spline {
        let n = c.len();

        // B-spline coefficients of every derivative order 0..=k.
        let mut orders: Vec<Vec<f64>> = Vec::with_capacity(k + 1);
        orders.push(c.to_vec());
        for r in 1..=k {
            let prev = &orders[r - 1];
            let scale = (k - r + 1) as f64;
            let next = (0..n - r)
                .map(|i| {
                    let span = t[i + k + 1] - t[i + r];
                    if span > 0.0 {
                        scale * (prev[i + 1] - prev[i]) / span
                    } else {
                        0.0
                    }
                })
                .collect();
            orders.push(next);
        }

        let mut breaks = Vec::with_capacity(n - k + 1);
        let mut coeffs = Vec::with_capacity((n - k) * (k + 1));
        for l in k..n {
            if t[l + 1] <= t[l] {
                continue;
            }
            breaks.push(t[l]);
            let mut factorial = 1.0;
            for (r, order) in orders.iter().enumerate() {
                if r > 0 {
                    factorial *= r as f64;
                }
                let knots = &t[r..t.len() - r];
                let value = de_boor(knots, order, k - r, l - r, t[l]);
                coeffs.push(value / factorial);
            }
        }
        breaks.push(t[n]);

        Spline {
            origin,
            breaks,
            coeffs,
            degree: k,
        }
    }
}

/// Knot vector for the interpolating spline of degree `k` through `x`.
fn interpolation_knots(x: &[f64], k: usize) -> Vec<f64> {
    let n = x.len();
    let mut t = Vec::with_capacity(n + k + 1);
    t.extend(std::iter::repeat(x[0]).take(k + 1));
    for i in 0..n - k - 1 {
        if k % 2 == 1 {
            t.push(x[i + (k + 1) / 2]);
        } else {
            t.push(0.5 * (x[i + k / 2] + x[i + k / 2 + 1]));
        }
    }
    t.extend(std::iter::repeat(x[n - 1]).take(k + 1));
    t
}

/// Index `l` with `t[l] <= x < t[l + 1]`, clamped to the valid spans
/// `k ..= n - 1` of a spline with `n` coefficients.
fn find_span(t: &[f64], k: usize, n: usize, x: f64) -> usize {
    if x >= t[n] {
        return n - 1;
    }
    if x <= t[k] {
        return k;
    }
    let (mut lo, mut hi) = (k, n);
    while hi - lo > 1 {
        let mid = (lo + hi) / 2;
        if x >= t[mid] {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lo
}

/// The `k + 1` non-zero basis functions `B[span-k] ..= B[span]` at `x`.
fn basis_functions(t: &[f64], k: usize, span: usize, x: f64) -> Vec<f64> {
    let mut basis = vec![0.0; k + 1];
    let mut left = vec![0.0; k + 1];
    let mut right = vec![0.0; k + 1];
    basis[0] = 1.0;
    for j in 1..=k {
        left[j] = x - t[span + 1 - j];
        right[j] = t[span + j] - x;
        let mut saved = 0.0;
        for r in 0..j {
            let denom = right[r + 1] + left[j - r];
            let temp = if denom == 0.0 { 0.0 } else { basis[r] / denom };
            basis[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        basis[j] = saved;
    }
    basis
}

fn de_boor(t: &[f64], c: &[f64], k: usize, span: usize, x: f64) -> f64 {
    basis_functions(t, k, span, x)
        .iter()
        .enumerate()
        .map(|(r, b)| b * c[span - k + r])
        .sum()
}

/// Solve for the B-spline coefficients that interpolate `(x, y)`.
fn solve_collocation(x: &[f64], y: &[f64], t: &[f64], k: usize) -> Option<Vec<f64>> {
    let n = x.len();
    let mut matrix = BandMatrix::new(n, k);
    for (row, &xj) in x.iter().enumerate() {
        let span = find_span(t, k, n, xj);
        for (r, value) in basis_functions(t, k, span, xj).into_iter().enumerate() {
            matrix.set(row, span - k + r, value)?;
        }
    }
    matrix.solve(y.to_vec())
}

/// Square matrix with `width` non-zero diagonals on each side of the main
/// diagonal.
struct BandMatrix {
    n: usize,
    width: usize,
    data: Vec<f64>,
}

impl BandMatrix {
    fn new(n: usize, width: usize) -> Self {
        Self {
            n,
            width,
            data: vec![0.0; n * (2 * width + 1)],
        }
    }

    fn slot(&self, row: usize, col: usize) -> Option<usize> {
        if col + self.width < row || col > row + self.width || col >= self.n {
            return None;
        }
        Some(row * (2 * self.width + 1) + col + self.width - row)
    }

    fn get(&self, row: usize, col: usize) -> f64 {
        self.slot(row, col).map_or(0.0, |i| self.data[i])
    }

    fn set(&mut self, row: usize, col: usize, value: f64) -> Option<()> {
        let i = self.slot(row, col)?;
        self.data[i] = value;
        Some(())
    }

    /// Gaussian elimination without pivoting, then back substitution.
    fn solve(mut self, mut rhs: Vec<f64>) -> Option<Vec<f64>> {
        let n = self.n;
        let w = self.width;
        for p in 0..n {
            let pivot = self.get(p, p);
            if pivot.abs() < f64::MIN_POSITIVE {
                return None;
            }
            let last = (p + w).min(n - 1);
            for r in p + 1..=last {
                let factor = self.get(r, p) / pivot;
                if factor == 0.0 {
                    continue;
                }
                for col in p..=last {
                    let value = self.get(r, col) - factor * self.get(p, col);
                    self.set(r, col, value)?;
                }
                rhs[r] -= factor * rhs[p];
            }
        }

        let mut solution = vec![0.0; n];
        for p in (0..n).rev() {
            let last = (p + w).min(n - 1);
            let tail: f64 = (p + 1..=last).map(|c| self.get(p, c) * solution[c]).sum();
            solution[p] = (rhs[p] - tail) / self.get(p, p);
        }
        Some(solution)
    }
}

fn horner(coeffs: &[f64], u: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * u + c)
}

fn poly_derivative(coeffs: &[f64]) -> Vec<f64> {
    coeffs
        .iter()
        .enumerate()
        .skip(1)
        .map(|(r, c)| r as f64 * c)
        .collect()
}

/// Real roots of one polynomial on `[lo, hi]`.
fn poly_roots(coeffs: &[f64], lo: f64, hi: f64) -> Vec<f64> {
    match coeffs.iter().rposition(|c| *c != 0.0) {
        None | Some(0) => Vec::new(),
        Some(1) => {
            let root = -coeffs[0] / coeffs[1];
            if (lo..=hi).contains(&root) {
                vec![root]
            } else {
                Vec::new()
            }
        }
        Some(degree) => {
            let p = &coeffs[..=degree];
            let mut cuts = vec![lo];
            cuts.extend(
                poly_roots(&poly_derivative(p), lo, hi)
                    .into_iter()
                    .filter(|c| *c > lo && *c < hi),
            );
            cuts.push(hi);
            bracket_roots(|u| horner(p, u), &cuts)
        }
    }
}

/// Roots of `f` given ascending cuts between which `f` is monotone.
fn bracket_roots(f: impl Fn(f64) -> f64, cuts: &[f64]) -> Vec<f64> {
    let mut roots = Vec::new();
    for pair in cuts.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let (fa, fb) = (f(a), f(b));
        if fa == 0.0 {
            push_root(&mut roots, a);
        } else if fb != 0.0 && (fa < 0.0) != (fb < 0.0) {
            push_root(&mut roots, bisect(&f, a, b, fa));
        }
    }
    if let Some(&last) = cuts.last() {
        if f(last) == 0.0 {
            push_root(&mut roots, last);
        }
    }
    roots
}

fn push_root(roots: &mut Vec<f64>, root: f64) {
    if roots.last().map_or(true, |last| root - last > ROOT_MERGE_SECS) {
        roots.push(root);
    }
}

fn bisect(f: &impl Fn(f64) -> f64, mut a: f64, mut b: f64, mut fa: f64) -> f64 {
    for _ in 0..MAX_BISECTIONS {
        let mid = 0.5 * (a + b);
        if mid <= a || mid >= b {
            break;
        }
        let fm = f(mid);
        if fm == 0.0 {
            return mid;
        }
        if (fm < 0.0) == (fa < 0.0) {
            a = mid;
            fa = fm;
        } else {
            b = mid;
        }
    }
    0.5 * (a + b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn grid(n: usize, step: f64) -> Vec<f64> {
        (0..n).map(|i| i as f64 * step).collect()
    }

    #[test]
    fn test_rejects_degenerate_input() {
        assert!(Spline::interpolate(&[1.0], &[2.0], 3).is_none());
        assert!(Spline::interpolate(&[0.0, 1.0], &[2.0], 3).is_none());
        assert!(Spline::interpolate(&[0.0, 1.0], &[2.0, 3.0], 0).is_none());
        assert!(Spline::interpolate(&[0.0, 0.0, 1.0], &[1.0, 2.0, 3.0], 2).is_none());
        assert!(Spline::interpolate(&[0.0, f64::NAN], &[1.0, 2.0], 1).is_none());
    }

    #[test]
    fn test_two_points_fit_a_line() {
        let f = Spline::interpolate(&[10.0, 20.0], &[1.0, 3.0], 3).unwrap();
        assert_eq!(f.degree(), 1);
        assert_abs_diff_eq!(f.eval(15.0), 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(f.eval(10.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_degree_is_clamped_by_sample_count() {
        let f = Spline::interpolate(&[0.0, 1.0, 2.0], &[0.0, 1.0, 0.0], 3).unwrap();
        assert_eq!(f.degree(), 2);
        assert_abs_diff_eq!(f.eval(1.0), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(f.eval(0.5), 0.75, epsilon = 1e-12);
    }

    #[test]
    fn test_passes_through_every_sample() {
        let x = grid(40, 900.0);
        let y: Vec<f64> = x.iter().map(|t| (t / 3000.0).sin() + 0.1 * (t / 700.0).cos()).collect();
        for k in 1..=5 {
            let f = Spline::interpolate(&x, &y, k).unwrap();
            for (xi, yi) in x.iter().zip(&y) {
                assert_abs_diff_eq!(f.eval(*xi), *yi, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_reproduces_polynomials_of_its_degree() {
        let x: Vec<f64> = grid(9, 1.0).into_iter().map(|v| v + 0.3 * (v * 1.7).sin()).collect();
        let cubic = |t: f64| 1.0 - 2.0 * t + 0.5 * t * t - 0.1 * t * t * t;
        let quartic = |t: f64| cubic(t) + 0.02 * t.powi(4);

        let y: Vec<f64> = x.iter().map(|t| cubic(*t)).collect();
        let f = Spline::interpolate(&x, &y, 3).unwrap();
        for t in [0.25, 2.6, 5.1, 7.9] {
            assert_abs_diff_eq!(f.eval(t), cubic(t), epsilon = 1e-9);
        }

        let y: Vec<f64> = x.iter().map(|t| quartic(*t)).collect();
        let f = Spline::interpolate(&x, &y, 4).unwrap();
        let df = f.derivative();
        assert_eq!(df.degree(), 3);
        for t in [0.25, 2.6, 5.1, 7.9] {
            assert_abs_diff_eq!(f.eval(t), quartic(t), epsilon = 1e-9);
            let slope = -2.0 + t - 0.3 * t * t + 0.08 * t * t * t;
            assert_abs_diff_eq!(df.eval(t), slope, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_roots_of_reproduced_parabola() {
        let x = grid(7, 1.0);
        let y: Vec<f64> = x.iter().map(|t| (t - 1.5) * (t - 3.5)).collect();
        let roots = Spline::interpolate(&x, &y, 3).unwrap().roots();
        assert_eq!(roots.len(), 2);
        assert_abs_diff_eq!(roots[0], 1.5, epsilon = 1e-9);
        assert_abs_diff_eq!(roots[1], 3.5, epsilon = 1e-9);
    }

    #[test]
    fn test_root_on_a_sample_is_reported_once() {
        let x = grid(6, 1.0);
        let y: Vec<f64> = x.iter().map(|t| t - 2.0).collect();
        let roots = Spline::interpolate(&x, &y, 3).unwrap().roots();
        assert_eq!(roots.len(), 1);
        assert_abs_diff_eq!(roots[0], 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_no_roots_when_curve_stays_positive() {
        let x = grid(10, 1.0);
        let y: Vec<f64> = x.iter().map(|t| 5.0 + t.sin()).collect();
        assert!(Spline::interpolate(&x, &y, 3).unwrap().roots().is_empty());
    }

    #[test]
    fn test_derivative_roots_at_epoch_scale() {
        // Two days of quarter-hourly samples starting 2024-08-01T00:00Z.
        let period = 44_712.0;
        let t0 = 1_722_470_400.0;
        let x: Vec<f64> = (0..=192).map(|i| t0 + 900.0 * i as f64).collect();
        let y: Vec<f64> = x
            .iter()
            .map(|t| 2.0 + 1.5 * (std::f64::consts::TAU * (t - t0) / period).sin())
            .collect();

        let f = Spline::interpolate(&x, &y, 4).unwrap();
        let roots = f.derivative().roots();
        assert_eq!(roots.len(), 8);
        for (i, root) in roots.iter().enumerate() {
            let expected = t0 + period * (0.25 + 0.5 * i as f64);
            assert_abs_diff_eq!(*root, expected, epsilon = 60.0);
        }
    }

    #[test]
    fn test_extrapolates_with_boundary_piece() {
        let x = grid(5, 1.0);
        let y: Vec<f64> = x.iter().map(|t| 2.0 * t + 1.0).collect();
        let f = Spline::interpolate(&x, &y, 3).unwrap();
        assert_abs_diff_eq!(f.eval(-1.0), -1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(f.eval(5.5), 12.0, epsilon = 1e-9);
    }

    #[test]
    fn test_poly_roots_cubic() {
        // (u - 1)(u - 2)(u - 4)
        let coeffs = [-8.0, 14.0, -7.0, 1.0];
        let roots = poly_roots(&coeffs, 0.0, 5.0);
        assert_eq!(roots.len(), 3);
        for (root, expected) in roots.iter().zip([1.0, 2.0, 4.0]) {
            assert_abs_diff_eq!(*root, expected, epsilon = 1e-12);
        }
        assert_eq!(poly_roots(&coeffs, 2.5, 3.5), Vec::<f64>::new());
    }

    #[test]
    fn test_fit_is_deterministic() {
        let x = grid(30, 900.0);
        let y: Vec<f64> = x.iter().map(|t| (t / 5000.0).cos()).collect();
        let a = Spline::interpolate(&x, &y, 3).unwrap();
        let b = Spline::interpolate(&x, &y, 3).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.roots(), b.roots());
    }
}
