//! C6's runtime counterpart: what a generated executor calls when it needs
//! a request-scoped or transient dependency that wasn't lifted into a
//! constructor-injected field.

use std::any::{Any, TypeId};
use std::sync::Arc;

use ahash::HashMap;

/// A factory for one registered service — called once per request for a
/// request-scoped service, once per call for a transient one. The
/// distinction is the host's to make when it builds the factory map handed
/// to [`ServiceProviderScope::new`]; `Scope` itself just calls whatever
/// factory is registered.
pub type ServiceFactory = Box<dyn Fn() -> Arc<dyn Any + Send + Sync> + Send + Sync>;

/// Object-safe so a generated executor can hold `&dyn Scope` without
/// knowing which concrete scope implementation the host is using.
///
/// The generic `get_required_service::<T>()` call generated code actually
/// emits is an inherent method on `dyn Scope` (below), not a trait method —
/// trait methods can't be generic on a dyn-safe trait. The dyn-safe part of
/// the contract is [`Scope::get_required_service_dyn`]; it's no different
/// from `std::any::Any::downcast`, just erased the other direction.
pub trait Scope: Send + Sync {
    fn get_required_service_dyn(&self, type_id: TypeId) -> Option<Arc<dyn Any + Send + Sync>>;
}

impl dyn Scope {
    /// `scope.get_required_service::<ConcreteType>()` — what the DI-aware
    /// instance frame provider emits for a scoped or transient dependency.
    ///
    /// Panics if nothing is registered for `T`: by the time generated code
    /// reaches this call, `blueprint_codegen`'s `UnresolvedService` check
    /// has already guaranteed a registration exists for every type a
    /// generated method asks for — a panic here means the host's service
    /// catalog drifted from what it handed the codegen engine at build
    /// time.
    pub fn get_required_service<T: Send + Sync + 'static>(&self) -> Arc<T> {
        let erased = self
            .get_required_service_dyn(TypeId::of::<T>())
            .unwrap_or_else(|| panic!("no service registered for {}", std::any::type_name::<T>()));
        erased
            .downcast::<T>()
            .unwrap_or_else(|_| panic!("service factory for {} produced the wrong type", std::any::type_name::<T>()))
    }
}

/// A [`Scope`] backed by a fixed map of factories, built once by the host
/// from its service catalog.
#[derive(Clone, Default)]
pub struct ServiceProviderScope {
    factories: Arc<HashMap<TypeId, ServiceFactory>>,
}

impl ServiceProviderScope {
    pub fn new(factories: HashMap<TypeId, ServiceFactory>) -> Self {
        Self {
            factories: Arc::new(factories),
        }
    }
}

impl Scope for ServiceProviderScope {
    fn get_required_service_dyn(&self, type_id: TypeId) -> Option<Arc<dyn Any + Send + Sync>> {
        self.factories.get(&type_id).map(|factory| factory())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::HashMapExt;

    struct Repository(u32);

    #[test]
    fn registered_service_round_trips_through_get_required_service() {
        let mut factories: HashMap<TypeId, ServiceFactory> = HashMap::new();
        factories.insert(
            TypeId::of::<Repository>(),
            Box::new(|| Arc::new(Repository(42)) as Arc<dyn Any + Send + Sync>),
        );
        let scope = ServiceProviderScope::new(factories);
        let dyn_scope: &dyn Scope = &scope;
        let repository = dyn_scope.get_required_service::<Repository>();
        assert_eq!(repository.0, 42);
    }

    #[test]
    #[should_panic(expected = "no service registered")]
    fn unregistered_service_panics() {
        let scope = ServiceProviderScope::default();
        let dyn_scope: &dyn Scope = &scope;
        let _ = dyn_scope.get_required_service::<Repository>();
    }
}
