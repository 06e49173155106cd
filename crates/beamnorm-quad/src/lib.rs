#![doc = include_str!("../README.md")]

use thiserror::Error;

/// Abscissae of the 21-point Kronrod rule on [-1, 1] (non-negative half).
///
/// Odd indices are the abscissae of the embedded 10-point Gauss rule.
const XGK: [f64; 11] = [
    0.995_657_163_025_808_080_735_527_280_689_003,
    0.973_906_528_517_171_720_077_964_012_084_452,
    0.930_157_491_355_708_226_001_207_180_059_508,
    0.865_063_366_688_984_510_732_096_688_423_493,
    0.780_817_726_586_416_897_063_717_578_345_042,
    0.679_409_568_299_024_406_234_327_365_114_874,
    0.562_757_134_668_604_683_339_000_099_272_694,
    0.433_395_394_129_247_190_799_265_943_165_784,
    0.294_392_862_701_460_198_131_126_603_103_866,
    0.148_874_338_981_631_210_884_826_001_129_720,
    0.0,
];

/// Weights of the 21-point Kronrod rule.
const WGK: [f64; 11] = [
    0.011_694_638_867_371_874_278_064_396_062_192,
    0.032_558_162_307_964_727_478_818_972_459_390,
    0.054_755_896_574_351_996_031_381_300_244_580,
    0.075_039_674_810_919_952_767_043_140_916_190,
    0.093_125_454_583_697_605_535_065_465_083_366,
    0.109_387_158_802_297_641_899_210_590_325_805,
    0.123_491_976_262_065_851_077_680_710_345_322,
    0.134_709_217_311_473_325_928_054_001_771_707,
    0.142_775_938_577_060_080_797_094_273_138_717,
    0.147_739_104_901_338_491_374_841_515_972_068,
    0.149_445_554_002_916_905_664_936_468_389_821,
];

/// Weights of the 10-point Gauss rule.
const WG: [f64; 5] = [
    0.066_671_344_308_688_137_593_568_809_893_332,
    0.149_451_349_150_580_593_145_776_339_657_697,
    0.219_086_362_515_982_043_995_534_934_228_163,
    0.269_266_719_309_996_355_091_226_921_569_469,
    0.295_524_224_714_752_870_173_892_994_651_338,
];

/// Number of integrand evaluations per Gauss-Kronrod panel.
const POINTS_PER_PANEL: usize = 21;

/// Default subdivision budget, matching the QUADPACK drivers.
pub const DEFAULT_LIMIT: usize = 50;

/// Errors reported by the integrators.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuadError {
    /// Tolerances can never be met (both zero, negative or NaN).
    #[error("invalid tolerance: epsabs={epsabs}, epsrel={epsrel}")]
    InvalidTolerance {
        /// Requested absolute tolerance.
        epsabs: f64,
        /// Requested relative tolerance.
        epsrel: f64,
    },

    /// Integration bounds are not finite.
    #[error("invalid integration bounds: [{lower}, {upper}]")]
    InvalidBounds {
        /// Lower bound.
        lower: f64,
        /// Upper bound.
        upper: f64,
    },

    /// The subdivision budget was exhausted before the tolerance was met.
    #[error(
        "maximum number of subdivisions ({limit}) reached: value={value}, estimated error={abs_error}"
    )]
    SubdivisionLimit {
        /// Subdivision budget.
        limit: usize,
        /// Best estimate of the integral when giving up.
        value: f64,
        /// Error estimate when giving up.
        abs_error: f64,
    },

    /// The integrand returned NaN or an infinity.
    #[error("integrand returned a non-finite value ({value}) at x={x}")]
    NonFinite {
        /// Abscissa of the offending evaluation.
        x: f64,
        /// Value returned by the integrand.
        value: f64,
    },

    /// An interval became too small to be bisected further.
    #[error("roundoff prevents further subdivision near x={x} (estimated error={abs_error})")]
    RoundoffLimit {
        /// Midpoint of the interval that could not be split.
        x: f64,
        /// Error estimate at that point.
        abs_error: f64,
    },
}

/// Stopping criteria for the adaptive integrators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadOptions {
    /// Absolute error tolerance.
    pub epsabs: f64,
    /// Relative error tolerance.
    pub epsrel: f64,
    /// Maximum number of subintervals.
    pub limit: usize,
}

impl Default for QuadOptions {
    fn default() -> Self {
        Self {
            epsabs: 1.49e-8,
            epsrel: 1.49e-8,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl QuadOptions {
    /// Absolute tolerance only: the relative tolerance is zero.
    pub fn absolute(epsabs: f64) -> Self {
        Self {
            epsabs,
            epsrel: 0.0,
            limit: DEFAULT_LIMIT,
        }
    }

    /// Replace the subdivision budget.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Check that the tolerances can be met at all.
    pub fn validate(&self) -> Result<(), QuadError> {
        let epsrel_floor = (50.0 * f64::EPSILON).max(5e-29);
        let usable = self.epsabs.is_finite()
            && self.epsrel.is_finite()
            && self.epsabs >= 0.0
            && self.epsrel >= 0.0
            && (self.epsabs > 0.0 || self.epsrel >= epsrel_floor)
            && self.limit > 0;
        if usable {
            Ok(())
        } else {
            Err(QuadError::InvalidTolerance {
                epsabs: self.epsabs,
                epsrel: self.epsrel,
            })
        }
    }

    fn tolerance_for(&self, value: f64) -> f64 {
        self.epsabs.max(self.epsrel * value.abs())
    }
}

/// Outcome of a converged integration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadResult {
    /// Integral estimate.
    pub value: f64,
    /// Estimated absolute error.
    pub abs_error: f64,
    /// Number of integrand evaluations.
    pub evaluations: usize,
    /// Number of subintervals used by the (outer) integrator.
    pub subdivisions: usize,
}

#[derive(Debug, Clone, Copy)]
struct Panel {
    lower: f64,
    upper: f64,
    value: f64,
    error: f64,
}

/// Apply the 21-point Gauss-Kronrod rule on `[lower, upper]`.
///
/// The error estimate follows QUADPACK's QK21: the Kronrod/Gauss difference
/// scaled against the variation of the integrand, floored by the roundoff
/// level of the panel.
fn gauss_kronrod<F: FnMut(f64) -> f64>(
    f: &mut F,
    lower: f64,
    upper: f64,
) -> Result<Panel, QuadError> {
    let mut eval = |x: f64| -> Result<f64, QuadError> {
        let value = f(x);
        if value.is_finite() {
            Ok(value)
        } else {
            Err(QuadError::NonFinite { x, value })
        }
    };

    let center = 0.5 * (lower + upper);
    let half_length = 0.5 * (upper - lower);
    let abs_half_length = half_length.abs();

    let f_center = eval(center)?;
    let mut res_gauss = 0.0;
    let mut res_kronrod = WGK[10] * f_center;
    let mut res_abs = res_kronrod.abs();
    let mut fv1 = [0.0; 10];
    let mut fv2 = [0.0; 10];

    for j in 0..5 {
        let jtw = 2 * j + 1;
        let abscissa = half_length * XGK[jtw];
        let f1 = eval(center - abscissa)?;
        let f2 = eval(center + abscissa)?;
        fv1[jtw] = f1;
        fv2[jtw] = f2;
        let sum = f1 + f2;
        res_gauss += WG[j] * sum;
        res_kronrod += WGK[jtw] * sum;
        res_abs += WGK[jtw] * (f1.abs() + f2.abs());
    }

    for j in 0..5 {
        let jtwm1 = 2 * j;
        let abscissa = half_length * XGK[jtwm1];
        let f1 = eval(center - abscissa)?;
        let f2 = eval(center + abscissa)?;
        fv1[jtwm1] = f1;
        fv2[jtwm1] = f2;
        res_kronrod += WGK[jtwm1] * (f1 + f2);
        res_abs += WGK[jtwm1] * (f1.abs() + f2.abs());
    }

    let mean = 0.5 * res_kronrod;
    let mut res_asc = WGK[10] * (f_center - mean).abs();
    for j in 0..10 {
        res_asc += WGK[j] * ((fv1[j] - mean).abs() + (fv2[j] - mean).abs());
    }

    let value = res_kronrod * half_length;
    res_abs *= abs_half_length;
    res_asc *= abs_half_length;
    let mut error = ((res_kronrod - res_gauss) * half_length).abs();

    if res_asc != 0.0 && error != 0.0 {
        error = res_asc * (200.0 * error / res_asc).powf(1.5).min(1.0);
    }
    if res_abs > f64::MIN_POSITIVE / (50.0 * f64::EPSILON) {
        error = error.max(50.0 * f64::EPSILON * res_abs);
    }

    Ok(Panel {
        lower,
        upper,
        value,
        error,
    })
}

/// Integrate `f` over `[a, b]` with a globally adaptive Gauss-Kronrod scheme.
///
/// The panel with the largest error estimate is bisected until the summed
/// error estimate is below `max(epsabs, epsrel * |value|)`.
///
/// # Errors
///
/// * [`QuadError::InvalidTolerance`] / [`QuadError::InvalidBounds`] for bad input
/// * [`QuadError::SubdivisionLimit`] when `limit` panels are not enough
/// * [`QuadError::NonFinite`] when the integrand returns NaN or an infinity
/// * [`QuadError::RoundoffLimit`] when a panel cannot be split any further
pub fn quad<F: FnMut(f64) -> f64>(
    mut f: F,
    a: f64,
    b: f64,
    options: &QuadOptions,
) -> Result<QuadResult, QuadError> {
    options.validate()?;
    if !a.is_finite() || !b.is_finite() {
        return Err(QuadError::InvalidBounds { lower: a, upper: b });
    }
    if a == b {
        return Ok(QuadResult {
            value: 0.0,
            abs_error: 0.0,
            evaluations: 0,
            subdivisions: 0,
        });
    }

    let first = gauss_kronrod(&mut f, a, b)?;
    let mut evaluations = POINTS_PER_PANEL;
    let mut value = first.value;
    let mut abs_error = first.error;
    let mut panels = vec![first];

    while abs_error > options.tolerance_for(value) {
        if panels.len() >= options.limit {
            return Err(QuadError::SubdivisionLimit {
                limit: options.limit,
                value,
                abs_error,
            });
        }

        let worst = panels
            .iter()
            .enumerate()
            .max_by(|(_, l), (_, r)| l.error.total_cmp(&r.error))
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        let panel = panels.swap_remove(worst);
        let mid = 0.5 * (panel.lower + panel.upper);

        let scale = panel
            .lower
            .abs()
            .max(panel.upper.abs())
            .max(1000.0 * f64::MIN_POSITIVE);
        if (panel.upper - panel.lower).abs() <= 100.0 * f64::EPSILON * scale {
            return Err(QuadError::RoundoffLimit { x: mid, abs_error });
        }

        let left = gauss_kronrod(&mut f, panel.lower, mid)?;
        let right = gauss_kronrod(&mut f, mid, panel.upper)?;
        evaluations += 2 * POINTS_PER_PANEL;

        value += left.value + right.value - panel.value;
        abs_error += left.error + right.error - panel.error;
        panels.push(left);
        panels.push(right);
    }

    // resum to drop the drift of the running updates
    let value = panels.iter().map(|p| p.value).sum();
    let abs_error = panels.iter().map(|p| p.error).sum();

    Ok(QuadResult {
        value,
        abs_error,
        evaluations,
        subdivisions: panels.len(),
    })
}

/// Double integral of `f(y, x)` for `x` in `[a, b]` and `y` in `[gfun(x), hfun(x)]`.
///
/// Each inner integral uses the same options as the outer one. The returned
/// error is the outer integrator's estimate; `evaluations` counts calls of `f`.
///
/// # Errors
///
/// Any error from an inner integral aborts the computation and is returned
/// as is; otherwise see [`quad`].
pub fn dblquad<F, G, H>(
    mut f: F,
    a: f64,
    b: f64,
    gfun: G,
    hfun: H,
    options: &QuadOptions,
) -> Result<QuadResult, QuadError>
where
    F: FnMut(f64, f64) -> f64,
    G: Fn(f64) -> f64,
    H: Fn(f64) -> f64,
{
    let mut inner_error: Option<QuadError> = None;
    let mut evaluations = 0usize;

    let outer = quad(
        |x| {
            if inner_error.is_some() {
                return f64::NAN;
            }
            match quad(|y| f(y, x), gfun(x), hfun(x), options) {
                Ok(inner) => {
                    evaluations += inner.evaluations;
                    inner.value
                }
                Err(e) => {
                    inner_error = Some(e);
                    f64::NAN
                }
            }
        },
        a,
        b,
        options,
    );

    if let Some(e) = inner_error {
        return Err(e);
    }
    let outer = outer?;
    Ok(QuadResult {
        value: outer.value,
        abs_error: outer.abs_error,
        evaluations,
        subdivisions: outer.subdivisions,
    })
}
