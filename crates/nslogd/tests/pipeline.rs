//! Integration tests for the namespace pipeline.

use std::path::Path;
use std::time::Duration;

use nslog_common::{ApplyErrorPolicy, NamespaceId, NslogError, WatcherConfig};
use nslog_netfilter::{MemoryBackend, RuleSpec};
use nslogd::Coordinator;
use nslogd::source::{Sinks, pipeline};

const CHAIN: &str = "neutron-l3-agent-POSTROUTING";

fn ns(name: &str) -> NamespaceId {
    NamespaceId::new(name).unwrap()
}

fn has_rule(backend: &MemoryBackend, name: &str) -> bool {
    backend
        .rules(&ns(name), "nat", CHAIN)
        .is_some_and(|rules| !rules.is_empty())
}

fn touch(registry: &Path, name: &str) {
    std::fs::write(registry.join(name), b"").unwrap();
}

/// Poll `condition` until it holds or the timeout expires.
async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("condition not reached within timeout");
}

/// Push namespaces through `supervise` and return the error that ended it.
async fn supervise(coordinator: &Coordinator<MemoryBackend>, namespaces: &[&str]) -> NslogError {
    let (sinks, streams) = pipeline();
    for name in namespaces {
        assert!(sinks.namespace(ns(name)));
    }
    let Sinks { namespaces, errors } = sinks;
    drop(namespaces);
    coordinator.supervise(streams, errors).await
}

#[test_log::test(tokio::test)]
async fn existing_and_created_namespaces_get_rules() {
    let registry = tempfile::tempdir().unwrap();
    for name in ["qrouter-abc", "qrouter-def", "other-xyz"] {
        touch(registry.path(), name);
    }

    let backend = MemoryBackend::new();
    for name in ["qrouter-abc", "qrouter-def", "qrouter-new", "other-xyz", "other-late"] {
        backend.add_chain(&ns(name), "nat", CHAIN);
    }

    let config = WatcherConfig::default().with_registry(registry.path());
    let run = tokio::spawn(Coordinator::new(config, backend.clone()).run());

    wait_until(|| has_rule(&backend, "qrouter-abc") && has_rule(&backend, "qrouter-def")).await;

    touch(registry.path(), "other-late");
    touch(registry.path(), "qrouter-new");
    wait_until(|| has_rule(&backend, "qrouter-new")).await;

    for name in ["qrouter-abc", "qrouter-def", "qrouter-new"] {
        let rules = backend.rules(&ns(name), "nat", CHAIN).unwrap();
        assert!(!rules.is_empty(), "{name} has no rule");
        assert!(rules.iter().all(|rule| *rule == RuleSpec::log(CHAIN)));
    }
    for name in ["other-xyz", "other-late"] {
        assert!(backend.rules(&ns(name), "nat", CHAIN).unwrap().is_empty());
        assert!(!backend.opened().contains(&ns(name)));
    }

    // A namespace that vanished before its rules were applied ends the run.
    touch(registry.path(), "qrouter-ghost");
    let result = tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .expect("coordinator did not stop")
        .unwrap();
    let err = result.unwrap_err();
    assert!(matches!(err, NslogError::NamespaceOpen { .. }));
    assert_eq!(err.namespace(), Some("qrouter-ghost"));
}

#[tokio::test]
async fn namespaces_are_processed_in_arrival_order() {
    let backend = MemoryBackend::new();
    for name in ["qrouter-c", "qrouter-a", "qrouter-b"] {
        backend.add_chain(&ns(name), "nat", CHAIN);
    }
    let coordinator = Coordinator::new(WatcherConfig::default(), backend.clone());

    let err = supervise(&coordinator, &["qrouter-c", "qrouter-a", "qrouter-b"]).await;

    assert!(matches!(err, NslogError::Internal { .. }));
    assert_eq!(
        backend.opened(),
        [ns("qrouter-c"), ns("qrouter-a"), ns("qrouter-b")]
    );
}

#[tokio::test]
async fn duplicate_reports_insert_twice_without_corrupting_the_chain() {
    let backend = MemoryBackend::new();
    let abc = ns("qrouter-abc");
    backend.add_chain(&abc, "nat", CHAIN);
    let coordinator = Coordinator::new(WatcherConfig::default(), backend.clone());

    supervise(&coordinator, &["qrouter-abc", "qrouter-abc"]).await;

    assert_eq!(
        backend.rules(&abc, "nat", CHAIN).unwrap(),
        [RuleSpec::log(CHAIN), RuleSpec::log(CHAIN)]
    );
}

#[tokio::test]
async fn applier_failure_halts_the_pipeline() {
    let backend = MemoryBackend::new();
    backend.add_chain(&ns("qrouter-after"), "nat", CHAIN);
    let coordinator = Coordinator::new(WatcherConfig::default(), backend.clone());

    let err = supervise(&coordinator, &["qrouter-ghost", "qrouter-after"]).await;

    assert_eq!(err.namespace(), Some("qrouter-ghost"));
    assert_eq!(backend.opened(), [ns("qrouter-ghost")]);
    assert!(
        backend
            .rules(&ns("qrouter-after"), "nat", CHAIN)
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn queued_error_wins_over_queued_namespaces() {
    let backend = MemoryBackend::new();
    backend.add_chain(&ns("qrouter-abc"), "nat", CHAIN);
    let coordinator = Coordinator::new(WatcherConfig::default(), backend.clone());

    let (sinks, streams) = pipeline();
    assert!(sinks.namespace(ns("qrouter-abc")));
    sinks.fail(NslogError::WatchClosed {
        path: "/var/run/netns".into(),
        reason: "event stream ended".to_string(),
    });

    let err = coordinator.supervise(streams, sinks.errors.clone()).await;

    assert!(matches!(err, NslogError::WatchClosed { .. }));
    assert!(backend.opened().is_empty());
}

#[tokio::test]
async fn skip_policy_isolates_failed_namespaces() {
    let backend = MemoryBackend::new();
    let failing = ns("qrouter-failing");
    backend.add_chain(&failing, "nat", CHAIN);
    backend.fail_inserts(&failing);
    backend.add_chain(&ns("qrouter-abc"), "nat", CHAIN);
    let config = WatcherConfig::default().with_apply_error_policy(ApplyErrorPolicy::Skip);
    let coordinator = Coordinator::new(config, backend.clone());

    let err = supervise(&coordinator, &["qrouter-ghost", "qrouter-failing", "qrouter-abc"]).await;

    assert!(matches!(err, NslogError::Internal { .. }));
    assert_eq!(
        backend.rules(&ns("qrouter-abc"), "nat", CHAIN).unwrap(),
        [RuleSpec::log(CHAIN)]
    );
}

#[tokio::test]
async fn missing_registry_is_fatal_at_startup() {
    let dir = tempfile::tempdir().unwrap();
    let config = WatcherConfig::default().with_registry(dir.path().join("netns"));

    let err = Coordinator::new(config, MemoryBackend::new())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, NslogError::Watch { .. }));
}

#[tokio::test]
async fn invalid_configuration_is_rejected_before_watching() {
    let dir = tempfile::tempdir().unwrap();
    let config = WatcherConfig::default()
        .with_registry(dir.path())
        .with_chains(Vec::<String>::new());

    let err = Coordinator::new(config, MemoryBackend::new())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, NslogError::Config { .. }));
}

#[test_log::test(tokio::test)]
async fn registry_is_created_on_request() {
    let dir = tempfile::tempdir().unwrap();
    let registry = dir.path().join("netns");
    let mut config = WatcherConfig::default().with_registry(&registry);
    config.create_registry = true;

    let run = tokio::spawn(Coordinator::new(config, MemoryBackend::new()).run());
    wait_until(|| registry.is_dir()).await;

    // Reported by the scan or by the watch, whichever sees it.
    touch(&registry, "qrouter-ghost");
    let err = tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .expect("coordinator did not stop")
        .unwrap()
        .unwrap_err();
    assert_eq!(err.namespace(), Some("qrouter-ghost"));
}
