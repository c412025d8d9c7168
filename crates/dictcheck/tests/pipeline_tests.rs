//! Pipeline Tests
//!
//! Drive the full coordinator with FakeServiceSource and FakePolicySource,
//! so every stage and both completion barriers run without network calls.

use dictcheck::fakes::{FakePolicyResponse, FakePolicySource, FakeServiceSource};
use dictcheck::report::write_report;
use dictcheck::{Coordinator, PipelineError, RunSummary};
use dictcheck_common::{Service, ServiceTarget, ServiceVersion};
use std::sync::Arc;
use std::time::Duration;

async fn run(
    services: FakeServiceSource,
    policy: FakePolicySource,
    ids: &[&str],
) -> Result<RunSummary, PipelineError> {
    let targets = ids.iter().map(|id| ServiceTarget::new(*id)).collect();
    Coordinator::new(
        Arc::new(services),
        Arc::new(policy),
        targets,
        "hostname_to_site_id",
    )
    .run()
    .await
}

fn report_text(summary: &RunSummary) -> String {
    let mut out = Vec::new();
    write_report(&mut out, &summary.discrepancies).unwrap();
    String::from_utf8(out).unwrap()
}

// ============================================================================
// Single-record scenarios
// ============================================================================

/// Matching site ID produces no output
#[tokio::test]
async fn test_matching_entry_prints_nothing() {
    let services =
        FakeServiceSource::new().with_service("s1", "fe1", 2, &[("example.com", "site123")]);
    let policy =
        FakePolicySource::new().respond("example.com", FakePolicyResponse::site("site123"));

    let summary = run(services, policy, &["s1"]).await.unwrap();

    assert!(summary.is_clean());
    assert_eq!(summary.matched, 1);
    assert_eq!(report_text(&summary), "");
}

/// Differing site ID produces exactly one block
#[tokio::test]
async fn test_mismatched_entry_prints_one_block() {
    let services =
        FakeServiceSource::new().with_service("s1", "fe1", 2, &[("example.com", "site123")]);
    let policy =
        FakePolicySource::new().respond("example.com", FakePolicyResponse::site("siteXYZ"));

    let summary = run(services, policy, &["s1"]).await.unwrap();

    assert_eq!(summary.discrepancies.len(), 1);
    assert_eq!(
        report_text(&summary),
        concat!(
            "Service: fe1\n",
            "Hostname: example.com\n",
            "Dictionary site ID: site123\n",
            "PDocs site ID:      siteXYZ\n",
            "-----\n",
        )
    );
}

/// 404 is logged as unverifiable and the run carries on
#[tokio::test]
async fn test_not_found_does_not_stop_pipeline() {
    let services = FakeServiceSource::new().with_service(
        "s1",
        "fe1",
        1,
        &[("missing.com", "site1"), ("wrong.com", "site2")],
    );
    let policy = FakePolicySource::new().respond("wrong.com", FakePolicyResponse::site("site9"));

    let summary = run(services, policy, &["s1"]).await.unwrap();

    assert_eq!(summary.unverifiable, 1);
    assert_eq!(summary.discrepancies.len(), 1);
    assert_eq!(summary.discrepancies[0].hostname, "wrong.com");
}

/// Transport errors on one record do not affect the others
#[tokio::test]
async fn test_lookup_error_is_isolated() {
    let services = FakeServiceSource::new().with_service(
        "s1",
        "fe1",
        1,
        &[("flaky.com", "site1"), ("good.com", "site2")],
    );
    let policy = FakePolicySource::new()
        .respond("flaky.com", FakePolicyResponse::error("connection reset"))
        .respond("good.com", FakePolicyResponse::site("site2"));

    let summary = run(services, policy, &["s1"]).await.unwrap();

    assert_eq!(summary.unverifiable, 1);
    assert_eq!(summary.matched, 1);
    assert!(summary.is_clean());
}

// ============================================================================
// Multi-service runs
// ============================================================================

#[tokio::test]
async fn test_every_entry_of_every_service_is_checked() {
    let services = FakeServiceSource::new()
        .with_service("s1", "fe1", 3, &[("a.com", "1"), ("b.com", "2")])
        .with_service("s2", "fe2", 1, &[("c.com", "3")])
        .with_service("s3", "GCDN-Canary", 5, &[("d.com", "4"), ("e.com", "5"), ("f.com", "6")]);
    let policy = FakePolicySource::new()
        .respond("a.com", FakePolicyResponse::site("1"))
        .respond("b.com", FakePolicyResponse::site("2"))
        .respond("c.com", FakePolicyResponse::site("x"))
        .respond("d.com", FakePolicyResponse::site("4"))
        .respond("e.com", FakePolicyResponse::site("y"))
        .respond("f.com", FakePolicyResponse::site("6"));
    let policy = Arc::new(policy);
    let services = Arc::new(services);

    let targets = vec![
        ServiceTarget::labeled("s1", "fe1"),
        ServiceTarget::labeled("s2", "fe2"),
        ServiceTarget::labeled("s3", "GCDN-Canary"),
    ];
    let summary = Coordinator::new(
        services.clone(),
        policy.clone(),
        targets,
        "hostname_to_site_id",
    )
    .run()
    .await
    .unwrap();

    assert_eq!(summary.services, 3);
    assert_eq!(summary.records, 6);
    assert_eq!(summary.matched, 4);
    assert_eq!(policy.lookup_count(), 6);
    assert_eq!(services.fetched_services(), vec!["s1", "s2", "s3"]);

    let mut mismatched: Vec<(String, String)> = summary
        .discrepancies
        .iter()
        .map(|d| (d.service_name.clone(), d.hostname.clone()))
        .collect();
    mismatched.sort();
    assert_eq!(
        mismatched,
        vec![
            ("GCDN-Canary".to_string(), "e.com".to_string()),
            ("fe2".to_string(), "c.com".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_empty_dictionary_is_fine() {
    let services = FakeServiceSource::new()
        .with_service("s1", "fe1", 1, &[])
        .with_service("s2", "fe2", 1, &[("a.com", "1")]);
    let policy = FakePolicySource::new().respond("a.com", FakePolicyResponse::site("1"));

    let summary = run(services, policy, &["s1", "s2"]).await.unwrap();
    assert_eq!(summary.services, 2);
    assert_eq!(summary.records, 1);
    assert_eq!(summary.matched, 1);
}

// ============================================================================
// Fatal errors
// ============================================================================

/// Unknown service aborts the run; nothing is reported, even for services
/// already fully processed
#[tokio::test]
async fn test_unknown_service_aborts_without_report() {
    let services = FakeServiceSource::new()
        .with_service("s1", "fe1", 1, &[("example.com", "site123")]);
    let policy =
        FakePolicySource::new().respond("example.com", FakePolicyResponse::site("siteXYZ"));

    let err = run(services, policy, &["s1", "bogus"]).await.unwrap_err();

    match &err {
        PipelineError::ServiceFetch { service_id, .. } => assert_eq!(service_id, "bogus"),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.to_string().contains("bogus"));
}

#[tokio::test]
async fn test_inconsistent_active_version_aborts() {
    let services = FakeServiceSource::new()
        .with_service("s1", "fe1", 1, &[("a.com", "1")])
        .with_raw_service(Service {
            id: "s2".to_string(),
            name: "fe2".to_string(),
            versions: vec![ServiceVersion {
                number: 9,
                active: false,
            }],
        });
    let policy = FakePolicySource::new().respond("a.com", FakePolicyResponse::site("1"));

    let err = run(services, policy, &["s1", "s2"]).await.unwrap_err();
    assert!(matches!(err, PipelineError::ActiveVersion { ref service, .. } if service == "fe2"));
}

#[tokio::test]
async fn test_listing_failure_aborts() {
    let services = FakeServiceSource::new()
        .with_service("s1", "fe1", 1, &[("a.com", "1")])
        .failing_listing("s1");

    let err = run(services, FakePolicySource::new(), &["s1"]).await.unwrap_err();
    assert!(matches!(err, PipelineError::DictionaryList { .. }));
}

/// A fatal error abandons in-flight verifications instead of waiting on them
#[tokio::test]
async fn test_fatal_error_does_not_wait_for_verifications() {
    let services = FakeServiceSource::new()
        .with_service("s1", "fe1", 1, &[("slow.com", "1")]);
    let policy = Arc::new(
        FakePolicySource::new()
            .respond("slow.com", FakePolicyResponse::site("1"))
            .with_latency(Duration::from_secs(30)),
    );
    let targets = vec![ServiceTarget::new("s1"), ServiceTarget::new("bogus")];

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        Coordinator::new(Arc::new(services), policy.clone(), targets, "hostname_to_site_id").run(),
    )
    .await
    .expect("run should abort promptly");

    assert!(result.is_err());
    assert_eq!(policy.completed_count(), 0);
}

// ============================================================================
// Drain
// ============================================================================

/// Slow verifications all finish before the run returns
#[tokio::test]
async fn test_run_waits_for_slow_verifications() {
    let entries: Vec<(String, String)> = (0..25)
        .map(|i| (format!("host{}.com", i), format!("site{}", i)))
        .collect();
    let entry_refs: Vec<(&str, &str)> = entries
        .iter()
        .map(|(h, s)| (h.as_str(), s.as_str()))
        .collect();

    let services = FakeServiceSource::new()
        .with_service("s1", "fe1", 1, &entry_refs)
        .with_latency(Duration::from_millis(1));
    let mut policy = FakePolicySource::new().with_latency(Duration::from_millis(50));
    for (host, site) in &entries {
        policy = policy.respond(host, FakePolicyResponse::site(site));
    }
    let policy = Arc::new(policy);

    let summary = Coordinator::new(
        Arc::new(services),
        policy.clone(),
        vec![ServiceTarget::new("s1")],
        "hostname_to_site_id",
    )
    .run()
    .await
    .unwrap();

    assert_eq!(summary.records, 25);
    assert_eq!(summary.matched, 25);
    assert_eq!(policy.completed_count(), 25);
    assert!(policy.peak_in_flight() > 1);
}
