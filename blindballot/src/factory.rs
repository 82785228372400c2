use crate::*;
use ed25519_dalek::PublicKey;
use std::collections::HashMap;

/// Creates and holds voter accounts
pub trait AccountFactory {
    /// The address the owner's account has, or will have once created
    fn account_address(&self, owner: &PublicKey) -> Address;

    /// Check that `create_account` would succeed for this owner
    fn check_create(&self, owner: &PublicKey) -> Result<(), Error>;

    /// Create the owner's account, failing with `AlreadyExists` if it has one
    fn create_account(&mut self, owner: PublicKey) -> Result<Address, Error>;

    /// Address of the account created `index`-th, counting from 0
    fn get_account(&self, index: usize) -> Option<Address>;

    fn account(&self, address: &Address) -> Option<&VoterAccount>;

    fn account_mut(&mut self, address: &Address) -> Option<&mut VoterAccount>;

    /// Number of accounts created so far
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Account factory deriving account addresses from its own address and the owner key
#[derive(Clone, Debug)]
pub struct VoterAccountFactory {
    address: Address,
    accounts: Vec<VoterAccount>,
    by_address: HashMap<Address, usize>,
}

impl VoterAccountFactory {
    pub fn new(address: Address) -> Self {
        VoterAccountFactory {
            address,
            accounts: vec![],
            by_address: HashMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

impl AccountFactory for VoterAccountFactory {
    fn account_address(&self, owner: &PublicKey) -> Address {
        Address::from_hash(&[
            b"blindballot.voter-account",
            self.address.as_bytes(),
            owner.as_bytes(),
        ])
    }

    fn check_create(&self, owner: &PublicKey) -> Result<(), Error> {
        if self.by_address.contains_key(&self.account_address(owner)) {
            return Err(Error::AlreadyExists);
        }
        Ok(())
    }

    fn create_account(&mut self, owner: PublicKey) -> Result<Address, Error> {
        self.check_create(&owner)?;

        let address = self.account_address(&owner);
        self.by_address.insert(address, self.accounts.len());
        self.accounts.push(VoterAccount::new(address, owner));

        Ok(address)
    }

    fn get_account(&self, index: usize) -> Option<Address> {
        self.accounts.get(index).map(|account| account.address)
    }

    fn account(&self, address: &Address) -> Option<&VoterAccount> {
        let index = *self.by_address.get(address)?;
        self.accounts.get(index)
    }

    fn account_mut(&mut self, address: &Address) -> Option<&mut VoterAccount> {
        let index = *self.by_address.get(address)?;
        self.accounts.get_mut(index)
    }

    fn len(&self) -> usize {
        self.accounts.len()
    }
}
