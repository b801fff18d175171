mod proptest_signatures;

pub(super) const MERCHANT_KEY: &str = include_str!("../../../tests/fixtures/merchant_key.pem");
pub(super) const PROCESSOR_CERT: &str = include_str!("../../../tests/fixtures/processor_cert.pem");
pub(super) const PROCESSOR_PUBLIC_KEY: &str =
    include_str!("../../../tests/fixtures/processor_public_key.pem");
pub(super) const FOREIGN_CERT: &str = include_str!("../../../tests/fixtures/foreign_cert.pem");
