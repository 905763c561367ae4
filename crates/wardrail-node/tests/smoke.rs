//! End-to-end smoke test for wardrail-node.
//!
//! Starts a real node process and exercises its JSON-RPC surface: read
//! endpoints (version, providers, payees, caps status) plus one
//! `execute` call against a deliberately mis-bound envelope, verifying
//! the policy-drift gate blocks it rather than erroring or panicking.
//!
//! Run with:
//!   cargo test -p wardrail-node --test smoke

use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use wardrail_core::{
    ActionKind, ActionSpec, ApprovalBundle, BundleContentHash, CircleId, Currency, EnvelopeBuilder,
    EnvelopeId, PayeeId, PersonId, PolicyHash, ProviderId, SystemClock, ViewHash,
};

// ── Node lifecycle ────────────────────────────────────────────────────────────

struct NodeGuard {
    child: Child,
}

impl Drop for NodeGuard {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Find a free TCP port on loopback.
fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

// ── RPC helpers ───────────────────────────────────────────────────────────────

async fn rpc_call(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let body = serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1
    });
    let resp = client
        .post(url)
        .json(&body)
        .send()
        .await
        .unwrap_or_else(|e| panic!("RPC call {method} failed: {e}"));
    resp.json().await.expect("parse RPC JSON")
}

/// Poll until the RPC server responds or the timeout elapses.
async fn wait_for_rpc(client: &reqwest::Client, url: &str, timeout: Duration) -> bool {
    let body = serde_json::json!({
        "jsonrpc": "2.0",
        "method": "wardrail_getVersion",
        "params": [],
        "id": 1
    });
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Ok(resp) = client.post(url).json(&body).send().await {
            if resp.status().is_success() {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    false
}

// ── Smoke test ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn smoke_node_rpc_surface() {
    let rpc_port = free_port();
    let rpc_url = format!("http://127.0.0.1:{}", rpc_port);

    let node_bin = env!("CARGO_BIN_EXE_wardrail-node");
    let child = Command::new(node_bin)
        .args([
            "--rpc-addr",
            &format!("127.0.0.1:{}", rpc_port),
            "--forced-pause-secs",
            "0",
            "--revocation-poll-ms",
            "10",
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn wardrail-node");

    let _guard = NodeGuard { child };

    let http = reqwest::Client::new();
    assert!(
        wait_for_rpc(&http, &rpc_url, Duration::from_secs(20)).await,
        "wardrail-node did not become ready within 20 seconds"
    );

    // ── getVersion ─────────────────────────────────────────────────────────
    let version = rpc_call(&http, &rpc_url, "wardrail_getVersion", serde_json::json!([])).await;
    assert!(version["result"]["node_version"].is_string());

    // ── getProviders: mock allowed, live registered but blocked by default ──
    let providers = rpc_call(&http, &rpc_url, "wardrail_getProviders", serde_json::json!([])).await;
    let providers = providers["result"].as_array().expect("providers array");
    let mock = providers
        .iter()
        .find(|p| p["provider_id"] == "mock")
        .expect("mock provider listed");
    assert_eq!(mock["allowed"], true);
    let live = providers
        .iter()
        .find(|p| p["provider_id"] == "live")
        .expect("live provider listed");
    assert_eq!(live["environment"], "Live");

    // ── getPayees ──────────────────────────────────────────────────────────
    let payees = rpc_call(&http, &rpc_url, "wardrail_getPayees", serde_json::json!([])).await;
    let payees = payees["result"].as_array().expect("payees array");
    assert!(payees.iter().any(|p| p["payee_id"] == "payee-sandbox-1"));

    // ── getCapsStatus for an untouched circle ─────────────────────────────
    let caps = rpc_call(
        &http,
        &rpc_url,
        "wardrail_getCapsStatus",
        serde_json::json!(["circle-primary", "GBP"]),
    )
    .await;
    let scopes = caps["result"].as_array().expect("caps scopes array");
    assert!(scopes.iter().all(|s| s["allowed"] == true));

    // ── execute: an envelope sealed against hashes that don't match the
    //    node's live policy/view state must come back Blocked, not a
    //    JSON-RPC error and not accepted. ─────────────────────────────────
    let clock = SystemClock;
    let action = ActionSpec {
        amount_minor: 500,
        currency: Currency::parse("GBP").unwrap(),
        payee_id: PayeeId::new("payee-sandbox-1"),
        provider_id: ProviderId::new("mock"),
        description: None,
        kind: ActionKind::Payment,
    };
    let envelope = EnvelopeBuilder::new(
        EnvelopeId::new("env-smoke-1"),
        action,
        CircleId::new("circle-primary"),
        PersonId::new("person-1"),
        PolicyHash::from_bytes([0u8; 32]),
        ViewHash::from_bytes([0u8; 32]),
    )
    .seal(&clock);

    let bundle = ApprovalBundle {
        envelope_id: envelope.envelope_id.clone(),
        action_hash: envelope.action_hash.clone(),
        content_hash: BundleContentHash::from_bytes([0u8; 32]),
        artifacts: vec![],
    };

    let exec = rpc_call(
        &http,
        &rpc_url,
        "wardrail_execute",
        serde_json::json!([{
            "envelope": envelope,
            "attempt_id": "attempt-smoke-1",
            "trace_id": "trace-smoke-1",
            "bundle": bundle,
        }]),
    )
    .await;
    assert!(exec.get("error").is_none(), "execute should not error, got {exec:?}");
    assert_eq!(
        exec["result"]["status"], "Blocked",
        "mismatched policy/view hash should block, got {exec:?}"
    );

    // ── getAttempt for an id that never reached the ledger ────────────────
    let attempt = rpc_call(
        &http,
        &rpc_url,
        "wardrail_getAttempt",
        serde_json::json!(["attempt-smoke-1"]),
    )
    .await;
    assert!(
        attempt["result"].is_null(),
        "a policy-blocked request never reaches the ledger"
    );
}
