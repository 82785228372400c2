use crate::*;
use std::sync::{Arc, Mutex, MutexGuard};

/// A ledger shared between threads
///
/// Every call takes the same lock, so operations are applied one at a time
/// and readers never see a half-applied one.
pub struct SharedLedger<F = VoterAccountFactory, T = Tally> {
    inner: Arc<Mutex<AuthorityLedger<F, T>>>,
}

impl<F, T> Clone for SharedLedger<F, T> {
    fn clone(&self) -> Self {
        SharedLedger {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: AccountFactory, T: TallyEngine> SharedLedger<F, T> {
    pub fn new(ledger: AuthorityLedger<F, T>) -> Self {
        SharedLedger {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<AuthorityLedger<F, T>>, Error> {
        self.inner.lock().map_err(|_| Error::LedgerPoisoned)
    }

    pub fn execute(&self, call: &RelayedCall) -> Result<Receipt, Error> {
        self.lock()?.execute(call)
    }

    /// Run `f` against a consistent view of the ledger
    pub fn read<R>(&self, f: impl FnOnce(&AuthorityLedger<F, T>) -> R) -> Result<R, Error> {
        Ok(f(&*self.lock()?))
    }

    /// Run `f` with exclusive access to the ledger
    pub fn with_mut<R>(
        &self,
        f: impl FnOnce(&mut AuthorityLedger<F, T>) -> R,
    ) -> Result<R, Error> {
        Ok(f(&mut *self.lock()?))
    }
}
