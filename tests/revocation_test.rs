mod common;

use std::sync::Arc;

use common::{CountingFetcher, default_fetcher, fixture_store, local_resolver};
use crl_revocation::pki::crl::{
    CrlCache, CrlError, DefaultCrlFetcher, FetchError, ParseError, RevocationReason,
};
use crl_revocation::pki::{CertificateEntry, RevocationChecker, RevocationStatus};

fn checker() -> (RevocationChecker, Arc<CountingFetcher<DefaultCrlFetcher>>) {
    let fetcher = Arc::new(CountingFetcher::new(default_fetcher()));
    let checker = RevocationChecker::new(
        local_resolver(),
        Arc::clone(&fetcher),
        Arc::new(CrlCache::new()),
    );
    (checker, fetcher)
}

#[test]
fn test_alias_scenario_over_two_passes() {
    let store = fixture_store();
    let (checker, fetcher) = checker();

    let expected = [
        ("valid", false),
        ("revoked", true),
        ("noExtension", false),
        ("unfetchable", false),
    ];

    for (alias, revoked) in expected {
        let cert = store.get(alias).expect("fixture alias");
        assert_eq!(checker.is_revoked(Some(&cert)), revoked, "first pass: {alias}");
    }
    assert!(!checker.is_revoked::<CertificateEntry>(None));

    let fetched_after_first_pass = fetcher.calls();
    assert_eq!(fetched_after_first_pass, 2, "certs.crl and missing.crl");

    for (alias, revoked) in expected {
        let cert = store.get(alias).expect("fixture alias");
        assert_eq!(checker.is_revoked(Some(&cert)), revoked, "second pass: {alias}");
    }
    assert!(!checker.is_revoked::<CertificateEntry>(None));

    assert_eq!(fetcher.calls(), fetched_after_first_pass);
}

#[test]
fn test_revoked_status_carries_entry_details() {
    let store = fixture_store();
    let (checker, _) = checker();
    let cert = store.get("revoked").unwrap();

    match checker.revocation_status(&cert) {
        RevocationStatus::Revoked { uri, serial, entry } => {
            assert!(uri.starts_with("file://"));
            assert!(uri.ends_with("/certs.crl"));
            assert_eq!(serial.to_string(), "1002");
            assert_eq!(entry.reason, Some(RevocationReason::KeyCompromise));
        }
        other => panic!("expected revoked, got {other:?}"),
    }
}

#[test]
fn test_unfetchable_crl_is_undetermined() {
    let store = fixture_store();
    let (checker, _) = checker();
    let cert = store.get("unfetchable").unwrap();

    match checker.revocation_status(&cert) {
        RevocationStatus::Undetermined { failures } => {
            assert_eq!(failures.len(), 1);
            assert!(matches!(
                failures[0],
                CrlError::Fetch(FetchError::NotFound { .. })
            ));
        }
        other => panic!("expected undetermined, got {other:?}"),
    }
    assert!(!checker.is_revoked(Some(&cert)));
}

#[test]
fn test_malformed_crl_fails_open() {
    let store = fixture_store();
    let (checker, fetcher) = checker();
    let cert = store.get("malformed").unwrap();

    assert!(!checker.is_revoked(Some(&cert)));
    match checker.revocation_status(&cert) {
        RevocationStatus::Undetermined { failures } => {
            assert!(matches!(
                failures[0],
                CrlError::Parse(ParseError::Malformed { .. })
            ));
        }
        other => panic!("expected undetermined, got {other:?}"),
    }

    // The parse failure is memoized like any other outcome
    assert_eq!(fetcher.calls(), 1);
}

#[test]
fn test_fallback_to_second_distribution_point() {
    let store = fixture_store();
    let (checker, fetcher) = checker();
    let cert = store.get("fallback").unwrap();

    assert!(checker.is_revoked(Some(&cert)));

    let requests = fetcher.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].ends_with("/missing.crl"));
    assert!(requests[1].ends_with("/certs.crl"));
}

#[test]
fn test_empty_crl_revokes_nothing() {
    let store = fixture_store();
    let (checker, _) = checker();
    let cert = store.get("emptyList").unwrap();

    match checker.revocation_status(&cert) {
        RevocationStatus::NotRevoked {
            consulted,
            failures,
        } => {
            assert_eq!(consulted.len(), 1);
            assert!(failures.is_empty());
        }
        other => panic!("expected not revoked, got {other:?}"),
    }
}

#[test]
fn test_no_extension_never_fetches() {
    let store = fixture_store();
    let (checker, fetcher) = checker();
    let cert = store.get("noExtension").unwrap();

    assert_eq!(
        checker.revocation_status(&cert),
        RevocationStatus::NoDistributionPoints
    );
    assert_eq!(fetcher.calls(), 0);
}

#[test]
fn test_clones_share_the_cache() {
    let store = fixture_store();
    let (checker, fetcher) = checker();
    let clone = checker.clone();

    assert!(checker.is_revoked(Some(&store.get("revoked").unwrap())));
    assert!(!clone.is_revoked(Some(&store.get("valid").unwrap())));

    assert_eq!(fetcher.calls(), 1);
    assert_eq!(clone.cache().len(), 1);
}
