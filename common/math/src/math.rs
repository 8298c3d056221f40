use core::cmp::Ordering;

use common_constants::{BPS, BPS_PRECISION, RAY, RAY_PRECISION, WAD, WAD_PRECISION};

mod context;

pub use context::{with_precision, NumericContext, PrecisionGuard, Rounding};

multiversx_sc::imports!();

/// Fixed-point primitives shared by the protocol model and the calculation oracle.
///
/// Every operation keeps the full integer product or quotient and performs a
/// single division. The half-up variants add the protocol's explicit half unit
/// and then truncate; only the remaining divisions go through
/// [`NumericContext::divide`]. Operands are never rescaled before multiplying,
/// so a RAY index is not truncated to token decimals mid-formula.
#[multiversx_sc::module]
pub trait SharedMathModule {
    /// `a * b` brought to `precision`, half-up.
    ///
    /// `mul_half_up(amount, index, amount_decimals)` is the protocol's `rayMul`
    /// in token units; with two RAY operands and `precision = 27` it is `rayMul`
    /// on rates.
    fn mul_half_up(
        &self,
        ctx: &NumericContext,
        a: &ManagedDecimal<Self::Api, NumDecimals>,
        b: &ManagedDecimal<Self::Api, NumDecimals>,
        precision: NumDecimals,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        let product = a.into_raw_units() * b.into_raw_units();
        self.rescale_raw(ctx, product, a.scale() + b.scale(), precision, true)
    }

    /// `a * b` brought to `precision`, truncated.
    fn mul_down(
        &self,
        ctx: &NumericContext,
        a: &ManagedDecimal<Self::Api, NumDecimals>,
        b: &ManagedDecimal<Self::Api, NumDecimals>,
        precision: NumDecimals,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        let product = a.into_raw_units() * b.into_raw_units();
        self.rescale_raw(ctx, product, a.scale() + b.scale(), precision, false)
    }

    /// `a / b` at `precision`, adding half of the denominator before dividing.
    fn div_half_up(
        &self,
        _ctx: &NumericContext,
        a: &ManagedDecimal<Self::Api, NumDecimals>,
        b: &ManagedDecimal<Self::Api, NumDecimals>,
        precision: NumDecimals,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        let (numerator, denominator) = self.quotient_terms(a, b, precision);
        let half_denominator = &denominator / &BigUint::from(2u64);

        self.to_decimal((numerator + half_denominator) / &denominator, precision)
    }

    /// `a / b` at `precision`, truncated.
    fn div_down(
        &self,
        ctx: &NumericContext,
        a: &ManagedDecimal<Self::Api, NumDecimals>,
        b: &ManagedDecimal<Self::Api, NumDecimals>,
        precision: NumDecimals,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        let (numerator, denominator) = self.quotient_terms(a, b, precision);

        self.to_decimal(ctx.divide(numerator, &denominator), precision)
    }

    /// Integer numerator and denominator of `a / b` expressed at `precision`,
    /// with the smallest power of ten that keeps both sides integral.
    fn quotient_terms(
        &self,
        a: &ManagedDecimal<Self::Api, NumDecimals>,
        b: &ManagedDecimal<Self::Api, NumDecimals>,
        precision: NumDecimals,
    ) -> (BigUint<Self::Api>, BigUint<Self::Api>) {
        let upper = precision + b.scale();
        let lower = a.scale();

        if upper >= lower {
            (
                a.into_raw_units() * &self.pow10(upper - lower),
                b.into_raw_units().clone(),
            )
        } else {
            (
                a.into_raw_units().clone(),
                b.into_raw_units() * &self.pow10(lower - upper),
            )
        }
    }

    fn rescale_raw(
        &self,
        ctx: &NumericContext,
        raw: BigUint<Self::Api>,
        from_precision: NumDecimals,
        to_precision: NumDecimals,
        half_up: bool,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        match to_precision.cmp(&from_precision) {
            Ordering::Equal => self.to_decimal(raw, to_precision),
            Ordering::Greater => {
                let factor = self.pow10(to_precision - from_precision);
                self.to_decimal(raw * factor, to_precision)
            },
            Ordering::Less => {
                let factor = self.pow10(from_precision - to_precision);
                let quotient = if half_up {
                    let half_factor = &factor / &BigUint::from(2u64);
                    (raw + half_factor) / &factor
                } else {
                    ctx.divide(raw, &factor)
                };
                self.to_decimal(quotient, to_precision)
            },
        }
    }

    fn rescale_half_up(
        &self,
        ctx: &NumericContext,
        value: &ManagedDecimal<Self::Api, NumDecimals>,
        new_precision: NumDecimals,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.rescale_raw(
            ctx,
            value.into_raw_units().clone(),
            value.scale(),
            new_precision,
            true,
        )
    }

    /// `value * bps / 10_000`, half-up, keeping the scale of `value`.
    fn percent_mul(
        &self,
        ctx: &NumericContext,
        value: &ManagedDecimal<Self::Api, NumDecimals>,
        percentage: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.mul_half_up(ctx, value, percentage, value.scale())
    }

    /// `value * 10_000 / bps`, half-up, keeping the scale of `value`.
    fn percent_div(
        &self,
        ctx: &NumericContext,
        value: &ManagedDecimal<Self::Api, NumDecimals>,
        percentage: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.div_half_up(ctx, value, percentage, value.scale())
    }

    fn pow10(&self, exponent: NumDecimals) -> BigUint<Self::Api> {
        BigUint::from(10u64).pow(exponent as u32)
    }

    fn to_decimal(
        &self,
        value: BigUint<Self::Api>,
        precision: NumDecimals,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        ManagedDecimal::from_raw_units(value, precision)
    }

    fn to_decimal_ray(&self, value: BigUint<Self::Api>) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.to_decimal(value, RAY_PRECISION)
    }

    fn to_decimal_wad(&self, value: BigUint<Self::Api>) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.to_decimal(value, WAD_PRECISION)
    }

    fn to_decimal_bps(&self, value: BigUint<Self::Api>) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.to_decimal(value, BPS_PRECISION)
    }

    fn zero_at(&self, precision: NumDecimals) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.to_decimal(BigUint::zero(), precision)
    }

    fn ray_zero(&self) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.zero_at(RAY_PRECISION)
    }

    fn wad_zero(&self) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.zero_at(WAD_PRECISION)
    }

    fn bps_zero(&self) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.zero_at(BPS_PRECISION)
    }

    fn ray(&self) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.to_decimal_ray(BigUint::from(RAY))
    }

    fn wad(&self) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.to_decimal_wad(BigUint::from(WAD))
    }

    fn bps(&self) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.to_decimal_bps(BigUint::from(BPS))
    }

    fn is_zero(&self, value: &ManagedDecimal<Self::Api, NumDecimals>) -> bool {
        value.into_raw_units() == &BigUint::zero()
    }

    /// `a - b`, or zero when `b > a`. Both operands must share a scale.
    fn saturating_sub(
        &self,
        a: &ManagedDecimal<Self::Api, NumDecimals>,
        b: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        if b.into_raw_units() >= a.into_raw_units() {
            return self.zero_at(a.scale());
        }
        self.to_decimal(a.into_raw_units() - b.into_raw_units(), a.scale())
    }

    fn add_same_scale(
        &self,
        a: &ManagedDecimal<Self::Api, NumDecimals>,
        b: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.to_decimal(a.into_raw_units() + b.into_raw_units(), a.scale())
    }

    fn get_min(
        &self,
        a: ManagedDecimal<Self::Api, NumDecimals>,
        b: ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        if a.into_raw_units() < b.into_raw_units() {
            a
        } else {
            b
        }
    }
}
