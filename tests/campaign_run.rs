// tests/campaign_run.rs
//
// Campaign state-machine tests against a wiremock collector double.
// Scripted-step and reload delays are shrunk so tests stay fast; the
// request counts on the mocks pin down the single-flight guarantee.
//
// Covered:
// - success flow: counters, progress 100, post-success store reload
// - double trigger → exactly one underlying request
// - non-2xx and success=false → Error, never retried
// - stop during the script: back to Idle, late result still lands
// - a settled runner accepts a fresh trigger

use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use tokio::time::sleep;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use prospect_dashboard::campaign::{CampaignRunner, CampaignState, CampaignStatus};
use prospect_dashboard::config::Config;
use prospect_dashboard::lead::Lead;
use prospect_dashboard::loader::{LeadStore, LoadOutcome, LoadStatus};

struct Harness {
    _data: TempDir,
    _state: TempDir,
    runner: CampaignRunner,
    store: LeadStore,
}

fn harness(server_uri: &str, step_delay_ms: u64) -> Harness {
    let data = tempfile::tempdir().expect("data dir");
    let state = tempfile::tempdir().expect("state dir");
    let cfg = Config {
        primary_leads_url: format!("{server_uri}/leads"),
        secondary_leads_url: format!("{server_uri}/api/leads"),
        campaign_url: format!("{server_uri}/api/campaign/run"),
        data_dir: data.path().to_path_buf(),
        cache_path: state.path().join("leads_cache.json"),
        campaign_step_delay_ms: step_delay_ms,
        campaign_reload_delay_ms: 10,
        ..Config::default()
    };
    let store = LeadStore::new(LoadOutcome {
        leads: vec![Lead {
            name: "Original Lead".to_string(),
            ..Lead::default()
        }],
        status: LoadStatus::Success,
        message: "seeded".to_string(),
        source_label: "test".to_string(),
    });
    let runner = CampaignRunner::new(&cfg, store.clone());
    Harness {
        _data: data,
        _state: state,
        runner,
        store,
    }
}

async fn wait_for_state(runner: &CampaignRunner, want: CampaignState) -> CampaignStatus {
    for _ in 0..500 {
        let st = runner.status();
        if st.state == want {
            return st;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "campaign never reached {want:?}, last state: {:?}",
        runner.status().state
    );
}

async fn wait_for_progress(runner: &CampaignRunner, at_least: u8) {
    for _ in 0..500 {
        if runner.status().progress >= at_least {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("campaign never passed progress {at_least}");
}

async fn mount_campaign_ok(server: &MockServer, collected: u64, qualified: u64, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/api/campaign/run"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "success": true,
            "data": {"leads_collected": collected, "leads_qualified": qualified}
        })))
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_reload_leads(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/leads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "success": true,
            "data": [{"name": "Reloaded Lead", "score": 5.0, "qualified": true, "level": "High"}]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn successful_run_reports_counters_and_reloads_the_store() {
    let server = MockServer::start().await;
    mount_campaign_ok(&server, 42, 17, 1).await;
    mount_reload_leads(&server).await;

    let h = harness(&server.uri(), 10);
    let initial = h.runner.trigger();
    assert_eq!(initial.state, CampaignState::Running);
    assert_eq!(initial.progress, 0);

    let done = wait_for_state(&h.runner, CampaignState::Success).await;
    assert_eq!(done.progress, 100);
    assert_eq!(done.leads_collected, 42);
    assert_eq!(done.leads_qualified, 17);
    assert!(
        done.log
            .iter()
            .any(|l| l.contains("Campaign completed successfully")),
        "log should record the completion: {:?}",
        done.log
    );

    // Post-success reload swaps the store to the remote collection.
    for _ in 0..200 {
        if h.store.view().leads[0].name == "Reloaded Lead" {
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(h.store.view().leads[0].name, "Reloaded Lead");
}

#[tokio::test]
async fn double_trigger_issues_exactly_one_request() {
    let server = MockServer::start().await;
    mount_campaign_ok(&server, 1, 1, 1).await; // .expect(1) is the point
    mount_reload_leads(&server).await;

    let h = harness(&server.uri(), 10);
    let first = h.runner.trigger();
    let second = h.runner.trigger();

    assert_eq!(first.state, CampaignState::Running);
    assert_eq!(second.state, CampaignState::Running, "no-op, not a restart");

    let done = wait_for_state(&h.runner, CampaignState::Success).await;
    let started = done
        .log
        .iter()
        .filter(|l| l.contains("Campaign started"))
        .count();
    assert_eq!(started, 1, "second trigger must not restart the script");
    // MockServer verifies the .expect(1) request count on drop.
}

#[tokio::test]
async fn failed_run_marks_error_and_never_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/campaign/run"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri(), 10);
    h.runner.trigger();

    let done = wait_for_state(&h.runner, CampaignState::Error).await;
    assert_eq!(done.progress, 0);
    assert!(done.message.contains("500"), "message: {}", done.message);
    assert!(done.log.iter().any(|l| l.contains("Error:")));

    // Give a hypothetical retry loop time to betray itself.
    sleep(Duration::from_millis(200)).await;
    assert_eq!(h.runner.status().state, CampaignState::Error);

    // Dashboard data is untouched by a failed campaign.
    assert_eq!(h.store.view().leads[0].name, "Original Lead");
}

#[tokio::test]
async fn collector_reported_failure_surfaces_its_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/campaign/run"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "success": false,
            "message": "collector exploded"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri(), 10);
    h.runner.trigger();

    let done = wait_for_state(&h.runner, CampaignState::Error).await;
    assert!(
        done.message.contains("collector exploded"),
        "message: {}",
        done.message
    );
}

#[tokio::test]
async fn stop_returns_to_idle_but_the_result_still_lands() {
    let server = MockServer::start().await;
    mount_campaign_ok(&server, 7, 3, 1).await;
    mount_reload_leads(&server).await;

    // Slow the script down so the stop lands mid-sequence.
    let h = harness(&server.uri(), 50);
    h.runner.trigger();
    wait_for_progress(&h.runner, 25).await;

    let stopped = h.runner.stop();
    assert_eq!(stopped.state, CampaignState::Idle);
    assert_eq!(stopped.progress, 0);
    assert!(stopped.log.iter().any(|l| l.contains("Campaign stopped")));

    // The request was already committed; its outcome overwrites the idle
    // state once it arrives (last writer wins), still a single request.
    let done = wait_for_state(&h.runner, CampaignState::Success).await;
    assert_eq!(done.leads_collected, 7);
    assert_eq!(done.leads_qualified, 3);
}

#[tokio::test]
async fn settled_runner_accepts_a_fresh_trigger() {
    let server = MockServer::start().await;
    // Success with no data object at all; counters must default to zero.
    Mock::given(method("POST"))
        .and(path("/api/campaign/run"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({"success": true})))
        .expect(2)
        .mount(&server)
        .await;
    mount_reload_leads(&server).await;

    let h = harness(&server.uri(), 10);
    h.runner.trigger();
    let done = wait_for_state(&h.runner, CampaignState::Success).await;
    assert_eq!(done.leads_collected, 0, "absent counters default to zero");

    // The guard stays held through the post-success reload; poll until the
    // runner actually accepts a new run.
    let mut restarted = false;
    for _ in 0..200 {
        if h.runner.trigger().state == CampaignState::Running {
            restarted = true;
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert!(restarted, "runner should accept a new trigger once settled");

    wait_for_state(&h.runner, CampaignState::Success).await;
}
