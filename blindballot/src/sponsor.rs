use crate::*;

/// Pays for relayed operations on behalf of the authority and its voter accounts
///
/// A sponsor only covers operations sent by its authority or by a voter
/// account that authority's ledger created, and only while it holds a deposit.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Sponsor {
    address: Address,
    authority: Address,
    deposit: u128,
}

impl Sponsor {
    pub fn new(address: Address, authority: Address) -> Self {
        Sponsor {
            address,
            authority,
            deposit: 0,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn authority(&self) -> Address {
        self.authority
    }

    /// Add funds to the deposit
    pub fn deposit_to(&mut self, amount: u128) {
        self.deposit = self.deposit.saturating_add(amount);
        debug!("sponsor {} deposit is now {}", self.address, self.deposit);
    }

    pub fn balance(&self) -> u128 {
        self.deposit
    }

    /// Check that this sponsor will pay for `operation` against `ledger`
    pub fn validate<F: AccountFactory, T: TallyEngine>(
        &self,
        ledger: &AuthorityLedger<F, T>,
        operation: &RelayedOperation,
    ) -> Result<(), Error> {
        if operation.sponsor != Some(self.address) {
            return Err(Error::NotSponsored(operation.sender));
        }
        if self.deposit == 0 {
            return Err(Error::SponsorUnfunded);
        }

        let covered = ledger.address()? == self.authority
            && (operation.sender == self.authority
                || ledger.voter_account(&operation.sender).is_some());
        if !covered {
            return Err(Error::NotSponsored(operation.sender));
        }

        Ok(())
    }
}
