use mockall::mock;
use shop_engine::{
    payment_objects::{CheckoutRequest, ProviderSession},
    traits::PaymentProviderError,
    PaymentProvider,
};

mock! {
    pub Provider {}
    impl PaymentProvider for Provider {
        async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<ProviderSession, PaymentProviderError>;
    }
}

/// A provider that must never be called.
pub fn idle_provider() -> MockProvider {
    let mut provider = MockProvider::new();
    provider.expect_create_checkout_session().never();
    provider
}
