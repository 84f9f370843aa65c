use haul_verify::{Checksum, ChecksumEngine};
use proptest::prelude::*;

proptest! {
    #[test]
    fn digest_verifies_its_own_input(data in proptest::collection::vec(any::<u8>(), 0..4096), chunk in 1usize..512) {
        let engine = ChecksumEngine::default().chunk_size(chunk);
        let digest = engine.digest(&data[..]).unwrap();
        prop_assert!(engine.verify(&data[..], &digest).unwrap());
    }

    #[test]
    fn digest_rejects_different_input(
        a in proptest::collection::vec(any::<u8>(), 0..1024),
        b in proptest::collection::vec(any::<u8>(), 0..1024),
    ) {
        prop_assume!(a != b);
        let engine = ChecksumEngine::default();
        let digest = engine.digest(&a[..]).unwrap();
        prop_assert!(!engine.verify(&b[..], &digest).unwrap());
    }

    #[test]
    fn rendered_digest_parses_back(data in proptest::collection::vec(any::<u8>(), 0..256)) {
        let digest = ChecksumEngine::default().digest(&data[..]).unwrap();
        let parsed: Checksum = digest.to_string().parse().unwrap();
        prop_assert_eq!(parsed, digest);
    }
}
