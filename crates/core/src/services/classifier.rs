use crate::model::{Address, SubsystemName};
use crate::oracles::{LineOracle, OracleError, OwnershipOracle};
use crate::services::ownership::SubsystemOracleClient;
use crate::services::resolver::AddressResolver;

/// Anything that can tell which subsystem an address belongs to.
///
/// `Ok(None)` covers both unresolvable addresses and undecodable ownership; only
/// oracle process failures are errors.
pub trait AddressClassifier {
    fn classify(&mut self, address: Address) -> Result<Option<SubsystemName>, OracleError>;
}

/// Address -> file -> subsystem pipeline over the two cached oracle clients.
pub struct SubsystemClassifier<L, O> {
    resolver: AddressResolver<L>,
    owners: SubsystemOracleClient<O>,
}

impl<L: LineOracle, O: OwnershipOracle> SubsystemClassifier<L, O> {
    pub fn new(resolver: AddressResolver<L>, owners: SubsystemOracleClient<O>) -> Self {
        Self { resolver, owners }
    }

    pub fn resolver(&self) -> &AddressResolver<L> {
        &self.resolver
    }

    pub fn owners(&self) -> &SubsystemOracleClient<O> {
        &self.owners
    }

    pub fn clear_caches(&mut self) {
        self.resolver.clear_cache();
        self.owners.clear_cache();
    }
}

impl<L: LineOracle, O: OwnershipOracle> AddressClassifier for SubsystemClassifier<L, O> {
    fn classify(&mut self, address: Address) -> Result<Option<SubsystemName>, OracleError> {
        let Some(file) = self.resolver.resolve(address)? else {
            return Ok(None);
        };
        Ok(self.owners.subsystem_of(&file)?.subsystem().cloned())
    }
}

impl<C: AddressClassifier + ?Sized> AddressClassifier for &mut C {
    fn classify(&mut self, address: Address) -> Result<Option<SubsystemName>, OracleError> {
        (**self).classify(address)
    }
}
