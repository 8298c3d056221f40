use core::cell::Cell;
use core::future::Future;

use common_constants::{DEFAULT_DECIMAL_PLACES, RAY_PRECISION};
use multiversx_sc::{api::ManagedTypeApi, types::BigUint, types::NumDecimals};
use serde::Deserialize;

/// How the final integer division of a fixed-point operation resolves the remainder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    /// Truncate toward zero, like unsigned integer division on chain.
    Down,
    /// Round the remainder half away from zero.
    HalfUp,
}

/// Working precision and rounding discipline for every fixed-point computation.
///
/// The value is passed explicitly through oracle and protocol math. A process-wide
/// default also exists for callers that have no context of their own; it is only
/// changed through [`with_precision`] / [`PrecisionGuard`] at scenario-file boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct NumericContext {
    /// Decimals used for rates and indexes.
    pub precision: NumDecimals,
    pub rounding: Rounding,
}

impl NumericContext {
    /// Integer truncation at RAY precision, matching the protocol's arithmetic.
    pub const PROTOCOL: NumericContext = NumericContext {
        precision: RAY_PRECISION,
        rounding: Rounding::Down,
    };

    /// What the process runs with outside any scenario file.
    pub const PROCESS_DEFAULT: NumericContext = NumericContext {
        precision: DEFAULT_DECIMAL_PLACES,
        rounding: Rounding::HalfUp,
    };

    pub fn current() -> NumericContext {
        ACTIVE_CONTEXT.with(|active| active.get())
    }

    /// Divides applying this context's rounding rule.
    pub fn divide<M: ManagedTypeApi>(
        &self,
        numerator: BigUint<M>,
        denominator: &BigUint<M>,
    ) -> BigUint<M> {
        match self.rounding {
            Rounding::Down => numerator / denominator,
            Rounding::HalfUp => {
                let half = denominator / &BigUint::from(2u64);
                (numerator + half) / denominator
            },
        }
    }
}

impl Default for NumericContext {
    fn default() -> Self {
        NumericContext::PROCESS_DEFAULT
    }
}

thread_local! {
    static ACTIVE_CONTEXT: Cell<NumericContext> = const { Cell::new(NumericContext::PROCESS_DEFAULT) };
}

/// Installs a context as the process default and puts the previous one back on drop.
#[must_use = "the previous context is restored as soon as the guard is dropped"]
pub struct PrecisionGuard {
    previous: NumericContext,
}

impl PrecisionGuard {
    pub fn install(context: NumericContext) -> Self {
        let previous = ACTIVE_CONTEXT.with(|active| active.replace(context));
        PrecisionGuard { previous }
    }
}

impl Drop for PrecisionGuard {
    fn drop(&mut self) {
        ACTIVE_CONTEXT.with(|active| active.set(self.previous));
    }
}

/// Runs `body` with `context` as the process default.
///
/// The previous default comes back on every exit path: normal completion, an
/// error value, a panic unwinding through the await, or the future being dropped.
pub async fn with_precision<F>(context: NumericContext, body: F) -> F::Output
where
    F: Future,
{
    let _guard = PrecisionGuard::install(context);
    body.await
}
