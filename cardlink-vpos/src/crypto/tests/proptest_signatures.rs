use proptest::prelude::*;

use super::{MERCHANT_KEY, PROCESSOR_CERT};
use crate::crypto::{RequestSigner, ResponseVerifier};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_signature_verification_roundtrip(
        values in prop::collection::vec("[a-zA-Z0-9 ._@-]{0,24}", 1..40),
    ) {
        let signer = RequestSigner::from_pem(MERCHANT_KEY).unwrap();
        let verifier = ResponseVerifier::from_pem(PROCESSOR_CERT).unwrap();

        let signature = signer.sign(&values).expect("Signature generation failed");

        prop_assert!(verifier.verify(&values, &signature));
    }

    #[test]
    fn test_tampered_value_fails(
        values in prop::collection::vec("[a-z0-9]{1,16}", 1..20),
        index in any::<prop::sample::Index>(),
    ) {
        let signer = RequestSigner::from_pem(MERCHANT_KEY).unwrap();
        let verifier = ResponseVerifier::from_pem(PROCESSOR_CERT).unwrap();
        let signature = signer.sign(&values).unwrap();

        let mut tampered = values.clone();
        let i = index.index(tampered.len());
        tampered[i].push('X');

        prop_assert!(!verifier.verify(&tampered, &signature));
    }

    #[test]
    fn test_truncated_signature_fails(
        values in prop::collection::vec("[a-z0-9]{1,16}", 1..20),
        cut in 1usize..300,
    ) {
        let signer = RequestSigner::from_pem(MERCHANT_KEY).unwrap();
        let verifier = ResponseVerifier::from_pem(PROCESSOR_CERT).unwrap();
        let signature = signer.sign(&values).unwrap();

        let truncated = &signature[..signature.len().saturating_sub(cut)];

        prop_assert!(!verifier.verify(&values, truncated));
    }
}
