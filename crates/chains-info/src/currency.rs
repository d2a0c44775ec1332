//! Currencies and the amount conversion between the two sides of the bridge.
//!
//! EVM side amounts carry more decimals than the substrate side ones. The
//! `precision_divisor` of a currency is the ratio between the two, and every
//! crossing pays a fixed fee plus an optional proportional one.

use ferry_relayer_types::{BigUint, ResourceId};
use ferry_relayer_utils::{Error, Result};
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::chains::tokens;

/// One row of the [`CurrencyTable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CurrencyEntry {
    /// `0` is the native currency of whichever chain does the lookup.
    pub asset_id: u32,
    pub resource_id: ResourceId,
    pub name: String,
    pub precision_divisor: u64,
    pub fixed_fee: u64,
    /// `0` disables the proportional fee.
    pub fee_rate_divisor: u64,
}

impl CurrencyEntry {
    fn new(
        asset_id: u32,
        resource_id: ResourceId,
        name: &str,
        precision_divisor: u64,
        fixed_fee: u64,
        fee_rate_divisor: u64,
    ) -> Self {
        Self {
            asset_id,
            resource_id,
            name: name.to_string(),
            precision_divisor,
            fixed_fee,
            fee_rate_divisor,
        }
    }

    fn proportional_fee(&self, base: &BigUint) -> BigUint {
        if self.fee_rate_divisor == 0 {
            BigUint::zero()
        } else {
            base / self.fee_rate_divisor
        }
    }
}

/// The currencies known to the relayer, scanned in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyTable(Vec<CurrencyEntry>);

impl Default for CurrencyTable {
    fn default() -> Self {
        Self(vec![
            CurrencyEntry::new(
                0,
                ResourceId::ORIGIN,
                tokens::KSM,
                1_000_000,
                10_000_000_000,
                1000,
            ),
            CurrencyEntry::new(
                0,
                ResourceId::ORIGIN,
                tokens::DOT,
                100_000_000,
                0,
                1000,
            ),
            CurrencyEntry::new(
                0,
                ResourceId::ORIGIN,
                tokens::PCX,
                10_000_000_000,
                10_000_000,
                1000,
            ),
            CurrencyEntry::new(
                1,
                ResourceId::XBTC,
                tokens::XBTC,
                10_000_000_000,
                0,
                0,
            ),
            CurrencyEntry::new(
                999,
                ResourceId::XASSET,
                tokens::XASSET,
                10_000_000_000,
                0,
                0,
            ),
        ])
    }
}

impl CurrencyTable {
    /// Builds a table from explicit entries.
    pub fn new(entries: Vec<CurrencyEntry>) -> Self {
        Self(entries)
    }

    /// Rejects entries that would make a conversion divide by zero.
    pub fn validate(&self) -> Result<()> {
        match self.0.iter().find(|c| c.precision_divisor == 0) {
            Some(c) => Err(Error::Validation(format!(
                "currency {} has a zero precision divisor",
                c.name
            ))),
            None => Ok(()),
        }
    }

    pub fn entries(&self) -> &[CurrencyEntry] {
        &self.0
    }
}

/// Which way an amount crosses the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards a multisig-style chain: divide by the precision divisor, then
    /// deduct the fee.
    ToDestination,
    /// Towards a contract chain: deduct the fee, then multiply by the
    /// precision divisor.
    ToOrigin,
}

impl Direction {
    /// The direction of a transfer, given whether its destination redeems
    /// through a multisig.
    pub fn for_destination(multisig_destination: bool) -> Self {
        if multisig_destination {
            Direction::ToDestination
        } else {
            Direction::ToOrigin
        }
    }
}

/// Resolves currencies for one chain and converts amounts with them.
#[derive(Debug, Clone)]
pub struct AmountConverter {
    table: CurrencyTable,
    native_token: String,
}

impl AmountConverter {
    /// `native_token` is the symbol of the chain doing the lookups. Asset `0`
    /// and the origin resource id resolve to it.
    pub fn new(table: CurrencyTable, native_token: impl Into<String>) -> Self {
        Self {
            table,
            native_token: native_token.into(),
        }
    }

    pub fn native_token(&self) -> &str {
        &self.native_token
    }

    fn is_native(&self, entry: &CurrencyEntry) -> bool {
        entry.name == self.native_token
    }

    /// Finds the currency of `asset_id`.
    pub fn resolve_by_asset_id(&self, asset_id: u32) -> Result<&CurrencyEntry> {
        self.table
            .0
            .iter()
            .find(|c| {
                if asset_id == 0 {
                    self.is_native(c)
                } else {
                    c.asset_id == asset_id
                }
            })
            .ok_or_else(|| Error::CurrencyNotFound(format!("asset {asset_id}")))
    }

    /// Finds the currency of `resource_id`.
    pub fn resolve_by_resource_id(
        &self,
        resource_id: &ResourceId,
    ) -> Result<&CurrencyEntry> {
        self.table
            .0
            .iter()
            .find(|c| {
                if *resource_id == ResourceId::ORIGIN {
                    self.is_native(c)
                } else {
                    c.resource_id == *resource_id
                }
            })
            .ok_or_else(|| {
                Error::CurrencyNotFound(format!("resource {resource_id}"))
            })
    }

    /// The native currency of this chain.
    pub fn resolve_native(&self) -> Result<&CurrencyEntry> {
        self.resolve_by_asset_id(0)
    }

    /// Maps a resource id to the asset id used by `XAssets`.
    pub fn asset_id_for_resource(&self, resource_id: &ResourceId) -> Result<u32> {
        self.resolve_by_resource_id(resource_id).map(|c| c.asset_id)
    }

    /// `floor(a / divisor) - fee`, where the proportional part of the fee is
    /// taken from the rescaled amount.
    pub fn to_destination(
        &self,
        amount: &BigUint,
        asset_id: u32,
    ) -> Result<BigUint> {
        let currency = self.resolve_by_asset_id(asset_id)?;
        ensure_divisor(currency)?;
        let rescaled = amount / currency.precision_divisor;
        let fee = BigUint::from(currency.fixed_fee)
            + currency.proportional_fee(&rescaled);
        let sent = checked_deduct(&rescaled, &fee)?;
        tracing::debug!(
            token = %currency.name,
            origin_amount = %amount,
            send_amount = %sent,
            "converted amount to destination precision",
        );
        Ok(sent)
    }

    /// `(a - fee) * divisor`, where the proportional part of the fee is taken
    /// from the original amount.
    pub fn to_origin(&self, amount: &BigUint, asset_id: u32) -> Result<BigUint> {
        let currency = self.resolve_by_asset_id(asset_id)?;
        ensure_divisor(currency)?;
        let fee = BigUint::from(currency.fixed_fee)
            + currency.proportional_fee(amount);
        let actual = checked_deduct(amount, &fee)?;
        let sent = actual * currency.precision_divisor;
        tracing::debug!(
            token = %currency.name,
            origin_amount = %amount,
            send_amount = %sent,
            "converted amount to origin precision",
        );
        Ok(sent)
    }

    /// Converts `amount` in the given direction.
    pub fn convert(
        &self,
        direction: Direction,
        amount: &BigUint,
        asset_id: u32,
    ) -> Result<BigUint> {
        match direction {
            Direction::ToDestination => self.to_destination(amount, asset_id),
            Direction::ToOrigin => self.to_origin(amount, asset_id),
        }
    }
}

fn ensure_divisor(currency: &CurrencyEntry) -> Result<()> {
    if currency.precision_divisor == 0 {
        return Err(Error::Validation(format!(
            "currency {} has a zero precision divisor",
            currency.name
        )));
    }
    Ok(())
}

fn checked_deduct(amount: &BigUint, fee: &BigUint) -> Result<BigUint> {
    if amount < fee {
        return Err(Error::InsufficientAmount {
            amount: amount.to_string(),
            fee: fee.to_string(),
        });
    }
    Ok(amount - fee)
}
