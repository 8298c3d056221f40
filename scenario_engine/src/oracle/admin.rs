use common_errors::FailureClass;
use common_structs::ReserveConfigUpdate;

use super::{CalculationOracle, Decimal, View};

impl CalculationOracle {
    /// Configuration changes touch neither indexes nor rates.
    pub(super) fn set_reserve_config(
        &self,
        view: &mut View,
        asset: &str,
        update: &ReserveConfigUpdate,
    ) -> Result<(), FailureClass> {
        let mut reserve = self.load_reserve(view, asset)?;
        update.apply(&mut reserve);
        self.store_reserve(view, asset, reserve);
        Ok(())
    }

    pub(super) fn set_asset_price(&self, view: &mut View, asset: &str, price: &Decimal) -> Result<(), FailureClass> {
        let mut reserve = self.load_reserve(view, asset)?;
        reserve.price = price.clone();
        self.store_reserve(view, asset, reserve);
        Ok(())
    }
}
