//! End-to-end reconciliation pipeline tests over mock collaborators:
//! award experience off-chain, then drive the update protocol and the
//! runner until the on-chain mirror converges (or correctly refuses to).

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use progression_bridge::{
    BridgeResult, ChainCapabilities, ChainClient, ChainHealth, ContentStore, ProofIndexClient,
    ProofLookup, ReceiptLookupClient, SignerContext, SubmitOutcome, UpdateTransaction,
};
use progression_core::{
    AssetId, AssetProof, CharacterId, DetailLevel, Digest32, IdempotencyKey, MetadataBuilder,
    ProgressionError, ReceiptSignature, SkillName,
};
use progression_executor::{
    AssetResolver, BackoffConfig, ReconciliationRunner, ResolverConfig, RunnerConfig,
    UpdateOutcome, UpdateProtocol, UpdateProtocolConfig,
};
use progression_store::{
    CharacterAssetEntity, CharacterAssetRepository, MemoryStore, ProgressionStore, SkillLedger,
};
use tokio::sync::Mutex;

// ---------------------------------------------------------------------------
// Mock collaborators
// ---------------------------------------------------------------------------

/// Chain client with a programmable outcome queue. An empty queue confirms
/// every submission. Optionally commits a store mutation mid-flight, between
/// the protocol's snapshot and its completion write.
struct MockChainClient {
    capabilities: ChainCapabilities,
    outcomes: Mutex<VecDeque<SubmitOutcome>>,
    submissions: Mutex<Vec<UpdateTransaction>>,
    mid_flight_mutation: Mutex<Option<(Arc<MemoryStore>, CharacterId)>>,
}

impl MockChainClient {
    fn new(capabilities: ChainCapabilities) -> Self {
        Self {
            capabilities,
            outcomes: Mutex::new(VecDeque::new()),
            submissions: Mutex::new(Vec::new()),
            mid_flight_mutation: Mutex::new(None),
        }
    }

    async fn push_outcome(&self, outcome: SubmitOutcome) {
        self.outcomes.lock().await.push_back(outcome);
    }

    async fn mutate_mid_flight(&self, store: Arc<MemoryStore>, character_id: CharacterId) {
        *self.mid_flight_mutation.lock().await = Some((store, character_id));
    }

    async fn submissions(&self) -> Vec<UpdateTransaction> {
        self.submissions.lock().await.clone()
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn submit_update(
        &self,
        signer: &SignerContext,
        transaction: &UpdateTransaction,
    ) -> BridgeResult<SubmitOutcome> {
        signer.acquire_submit_slot().await;

        if let Some((store, character_id)) = self.mid_flight_mutation.lock().await.take() {
            store
                .commit_mutation(&character_id)
                .await
                .expect("mid-flight mutation");
        }

        let mut submissions = self.submissions.lock().await;
        submissions.push(transaction.clone());
        let count = submissions.len();
        drop(submissions);

        Ok(self
            .outcomes
            .lock()
            .await
            .pop_front()
            .unwrap_or(SubmitOutcome::Confirmed {
                signature: format!("sig:{}", count),
            }))
    }

    async fn capabilities(&self) -> BridgeResult<ChainCapabilities> {
        Ok(self.capabilities.clone())
    }

    async fn health_check(&self) -> BridgeResult<ChainHealth> {
        Ok(ChainHealth::healthy())
    }
}

/// Proof index with per-asset proofs and a receipt mapping that becomes
/// visible only after a configurable number of polls.
struct MockProofIndex {
    proofs: Mutex<HashMap<AssetId, AssetProof>>,
    receipts: Mutex<HashMap<ReceiptSignature, (AssetId, u32)>>,
    receipt_calls: Mutex<u32>,
}

impl MockProofIndex {
    fn new() -> Self {
        Self {
            proofs: Mutex::new(HashMap::new()),
            receipts: Mutex::new(HashMap::new()),
            receipt_calls: Mutex::new(0),
        }
    }

    async fn set_proof(&self, asset_id: AssetId, proof: AssetProof) {
        self.proofs.lock().await.insert(asset_id, proof);
    }

    async fn set_receipt(&self, receipt: ReceiptSignature, asset_id: AssetId, visible_after: u32) {
        self.receipts
            .lock()
            .await
            .insert(receipt, (asset_id, visible_after));
    }

    async fn receipt_calls(&self) -> u32 {
        *self.receipt_calls.lock().await
    }
}

#[async_trait]
impl ProofIndexClient for MockProofIndex {
    async fn asset_proof(&self, asset_id: &AssetId) -> BridgeResult<ProofLookup> {
        Ok(match self.proofs.lock().await.get(asset_id) {
            Some(proof) => ProofLookup::Found(proof.clone()),
            None => ProofLookup::NotFound,
        })
    }

    async fn find_asset_by_receipt(
        &self,
        receipt: &ReceiptSignature,
    ) -> BridgeResult<Option<AssetId>> {
        let mut calls = self.receipt_calls.lock().await;
        *calls += 1;
        let current = *calls;
        drop(calls);

        Ok(self
            .receipts
            .lock()
            .await
            .get(receipt)
            .filter(|(_, visible_after)| current >= *visible_after)
            .map(|(asset_id, _)| asset_id.clone()))
    }

    async fn health_check(&self) -> BridgeResult<bool> {
        Ok(true)
    }
}

/// Push-style receipt lookup returning a fixed answer
struct MockReceiptLookup {
    hit: Option<AssetId>,
}

#[async_trait]
impl ReceiptLookupClient for MockReceiptLookup {
    async fn asset_for_receipt(
        &self,
        _receipt: &ReceiptSignature,
    ) -> BridgeResult<Option<AssetId>> {
        Ok(self.hit.clone())
    }
}

/// Content-addressed blob store
struct MockContentStore {
    blobs: Mutex<Vec<Vec<u8>>>,
}

impl MockContentStore {
    fn new() -> Self {
        Self {
            blobs: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ContentStore for MockContentStore {
    async fn put(&self, data: &[u8], _content_type: &str) -> BridgeResult<String> {
        let uri = format!("mem://{}", &Digest32::blake3(data).to_hex()[..16]);
        self.blobs.lock().await.push(data.to_vec());
        Ok(uri)
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

fn default_capabilities() -> ChainCapabilities {
    ChainCapabilities {
        max_transaction_bytes: 4096,
        max_proof_depth: 24,
        supports_leaf_replace: true,
    }
}

fn sample_proof() -> AssetProof {
    AssetProof {
        proof: vec![Digest32::blake3(b"sibling:0"), Digest32::blake3(b"sibling:1")],
        root: Digest32::blake3(b"root"),
        data_hash: Digest32::blake3(b"leaf-data"),
        creator_hash: Digest32::blake3(b"creator"),
        leaf_index: 7,
    }
}

fn fast_protocol_config() -> UpdateProtocolConfig {
    UpdateProtocolConfig {
        max_proof_refreshes: 5,
        proof_backoff: BackoffConfig {
            initial_delay_ms: 1,
            max_delay_ms: 2,
            multiplier: 2.0,
            jitter_factor: 0.0,
        },
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    chain: Arc<MockChainClient>,
    index: Arc<MockProofIndex>,
}

impl Harness {
    async fn with_resolved_character(character_id: &str, asset_id: &str) -> Self {
        let harness = Self::with_unresolved_character(character_id).await;
        let asset = AssetId::new(asset_id);
        harness
            .store
            .set_asset_id_if_unset(&CharacterId::new(character_id), &asset)
            .await
            .unwrap();
        harness.index.set_proof(asset, sample_proof()).await;
        harness
    }

    async fn with_unresolved_character(character_id: &str) -> Self {
        let store = Arc::new(MemoryStore::new());
        store
            .create_character(CharacterAssetEntity::new(
                CharacterId::new(character_id),
                "Tester",
            ))
            .await
            .unwrap();

        Self {
            store,
            chain: Arc::new(MockChainClient::new(default_capabilities())),
            index: Arc::new(MockProofIndex::new()),
        }
    }

    async fn award(&self, character_id: &str, skill: &str, key: &str, gain: u64) {
        SkillLedger::new(self.store.clone())
            .apply_experience(
                &CharacterId::new(character_id),
                &SkillName::new(skill),
                &IdempotencyKey::new(key),
                gain,
            )
            .await
            .unwrap();
    }

    fn protocol(&self) -> UpdateProtocol<MemoryStore> {
        UpdateProtocol::new(
            self.store.clone(),
            self.chain.clone(),
            self.index.clone(),
            Arc::new(MockContentStore::new()),
            Arc::new(SignerContext::new("signer:test").with_min_interval(Duration::ZERO)),
            default_capabilities(),
            fast_protocol_config(),
        )
    }

    fn runner(&self, config: RunnerConfig) -> ReconciliationRunner<MemoryStore> {
        ReconciliationRunner::new(self.store.clone(), Arc::new(self.protocol()), config)
    }
}

fn eager_runner_config(max_task_attempts: u32) -> RunnerConfig {
    RunnerConfig {
        scan_interval: Duration::from_millis(10),
        max_tasks_per_scan: 16,
        max_task_attempts,
        task_backoff: BackoffConfig {
            initial_delay_ms: 0,
            max_delay_ms: 0,
            multiplier: 2.0,
            jitter_factor: 0.0,
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_award_then_scan_converges_mirror() {
    let harness = Harness::with_resolved_character("char:1", "asset:1").await;
    harness.award("char:1", "mining", "key:1", 100).await;

    let stats = harness.runner(eager_runner_config(10)).scan_once().await;
    assert_eq!(stats.scanned, 1);
    assert_eq!(stats.confirmed, 1);

    let entity = harness
        .store
        .get_character(&CharacterId::new("char:1"))
        .await
        .unwrap()
        .unwrap();
    assert!(!entity.pending_onchain_update);
    assert_eq!(entity.last_committed_signature.as_deref(), Some("sig:1"));
    assert!(entity.last_metadata_uri.is_some());
    assert_eq!(entity.attempt_count, 0);

    // The submitted payload carries the version the attempt observed.
    let submissions = harness.chain.submissions().await;
    assert_eq!(submissions.len(), 1);
    let document: serde_json::Value = serde_json::from_slice(&submissions[0].payload).unwrap();
    assert_eq!(document["state_version"], entity.state_version);
    assert_eq!(
        submissions[0].new_data_hash,
        Digest32::blake3(&submissions[0].payload)
    );
}

#[tokio::test]
async fn test_stale_proof_refetches_then_confirms() {
    let harness = Harness::with_resolved_character("char:1", "asset:1").await;
    harness.award("char:1", "mining", "key:1", 100).await;
    harness.chain.push_outcome(SubmitOutcome::StaleRoot).await;
    harness.chain.push_outcome(SubmitOutcome::StaleRoot).await;

    let outcome = harness
        .protocol()
        .run_once(&CharacterId::new("char:1"))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        UpdateOutcome::Confirmed {
            superseded: false,
            ..
        }
    ));
    // Two stale submissions, one confirmed.
    assert_eq!(harness.chain.submissions().await.len(), 3);
}

#[tokio::test]
async fn test_stale_proof_budget_is_bounded() {
    let harness = Harness::with_resolved_character("char:1", "asset:1").await;
    harness.award("char:1", "mining", "key:1", 100).await;
    for _ in 0..5 {
        harness.chain.push_outcome(SubmitOutcome::StaleRoot).await;
    }

    let err = harness
        .protocol()
        .run_once(&CharacterId::new("char:1"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ProgressionError::ExhaustedRetries { attempts: 5, .. }
    ));
    // Still retryable: the row stays pending for a later scan.
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_mid_flight_mutation_keeps_row_pending() {
    let harness = Harness::with_resolved_character("char:1", "asset:1").await;
    harness.award("char:1", "mining", "key:1", 100).await;
    harness
        .chain
        .mutate_mid_flight(harness.store.clone(), CharacterId::new("char:1"))
        .await;

    let outcome = harness
        .protocol()
        .run_once(&CharacterId::new("char:1"))
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        UpdateOutcome::Confirmed {
            superseded: true,
            ..
        }
    ));

    // The newer mutation keeps the row pending; the next scan converges it.
    let entity = harness
        .store
        .get_character(&CharacterId::new("char:1"))
        .await
        .unwrap()
        .unwrap();
    assert!(entity.pending_onchain_update);

    let stats = harness.runner(eager_runner_config(10)).scan_once().await;
    assert_eq!(stats.confirmed, 1);
    let entity = harness
        .store
        .get_character(&CharacterId::new("char:1"))
        .await
        .unwrap()
        .unwrap();
    assert!(!entity.pending_onchain_update);
}

#[tokio::test]
async fn test_unresolved_character_defers_with_backoff() {
    let harness = Harness::with_unresolved_character("char:1").await;
    harness.award("char:1", "mining", "key:1", 100).await;

    let err = harness
        .protocol()
        .run_once(&CharacterId::new("char:1"))
        .await
        .unwrap_err();
    assert!(matches!(err, ProgressionError::UnresolvedAsset { .. }));

    let stats = harness.runner(eager_runner_config(10)).scan_once().await;
    assert_eq!(stats.deferred, 1);
    let entity = harness
        .store
        .get_character(&CharacterId::new("char:1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entity.attempt_count, 1);
    assert!(entity.next_retry_at.is_some());
    assert!(entity.pending_onchain_update);
}

#[tokio::test]
async fn test_oversize_payload_shrinks_detail_level() {
    let harness = Harness::with_resolved_character("char:1", "asset:1").await;
    // Several dirty skills make the full rendering meaningfully larger than
    // the core one.
    for (i, skill) in ["mining", "fishing", "smithing", "cooking", "woodcutting"]
        .iter()
        .enumerate()
    {
        harness
            .award("char:1", skill, &format!("key:{}", i), 500)
            .await;
    }

    let snapshot = harness
        .store
        .snapshot(&CharacterId::new("char:1"))
        .await
        .unwrap()
        .unwrap();
    let builder = MetadataBuilder::new();
    let full = builder.build(&snapshot, DetailLevel::Full).unwrap();
    let core = builder.build(&snapshot, DetailLevel::CoreOnly).unwrap();
    assert!(full.encoded_size() > core.encoded_size());

    // Ceiling admits the core rendering but not the full one.
    let capabilities = ChainCapabilities {
        max_transaction_bytes: core.encoded_size() + sample_proof().encoded_size(),
        ..default_capabilities()
    };
    let chain = Arc::new(MockChainClient::new(capabilities.clone()));
    let protocol = UpdateProtocol::new(
        harness.store.clone(),
        chain.clone(),
        harness.index.clone(),
        Arc::new(MockContentStore::new()),
        Arc::new(SignerContext::new("signer:test").with_min_interval(Duration::ZERO)),
        capabilities,
        fast_protocol_config(),
    );

    let outcome = protocol.run_once(&CharacterId::new("char:1")).await.unwrap();
    assert!(matches!(outcome, UpdateOutcome::Confirmed { .. }));

    let submissions = chain.submissions().await;
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].payload, core.canonical_bytes);
}

#[tokio::test]
async fn test_unsatisfiable_ceiling_exhausts_task() {
    let harness = Harness::with_resolved_character("char:1", "asset:1").await;
    harness.award("char:1", "mining", "key:1", 100).await;
    // The chain enforces a ceiling no rendering can meet.
    harness
        .chain
        .push_outcome(SubmitOutcome::PayloadTooLarge { max_bytes: 10 })
        .await;

    let stats = harness.runner(eager_runner_config(10)).scan_once().await;
    assert_eq!(stats.exhausted, 1);

    let entity = harness
        .store
        .get_character(&CharacterId::new("char:1"))
        .await
        .unwrap()
        .unwrap();
    assert!(entity.update_exhausted);
    // Exhausted rows drop out of the pending scan.
    assert!(harness.store.list_pending(16).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_attempt_budget_marks_task_exhausted() {
    let harness = Harness::with_resolved_character("char:1", "asset:1").await;
    harness.award("char:1", "mining", "key:1", 100).await;
    for _ in 0..2 {
        harness
            .chain
            .push_outcome(SubmitOutcome::Transient {
                reason: "blockhash not found".to_string(),
            })
            .await;
    }

    let runner = harness.runner(eager_runner_config(2));
    let first = runner.scan_once().await;
    assert_eq!(first.deferred, 1);
    let second = runner.scan_once().await;
    assert_eq!(second.exhausted, 1);

    let entity = harness
        .store
        .get_character(&CharacterId::new("char:1"))
        .await
        .unwrap()
        .unwrap();
    assert!(entity.update_exhausted);
    assert!(entity.pending_onchain_update);
    assert!(harness.store.list_pending(16).await.unwrap().is_empty());

    // A fresh mutation revives the task.
    harness.award("char:1", "mining", "key:2", 50).await;
    assert_eq!(harness.store.list_pending(16).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_failure_isolation_across_tasks() {
    let harness = Harness::with_resolved_character("char:1", "asset:1").await;
    // Second character stays unresolved, so its attempt always defers.
    harness
        .store
        .create_character(CharacterAssetEntity::new(
            CharacterId::new("char:2"),
            "Tester Two",
        ))
        .await
        .unwrap();
    harness.award("char:2", "mining", "key:a", 10).await;
    harness.award("char:1", "mining", "key:b", 10).await;

    let stats = harness.runner(eager_runner_config(10)).scan_once().await;
    assert_eq!(stats.scanned, 2);
    assert_eq!(stats.deferred, 1);
    assert_eq!(stats.confirmed, 1);
}

#[tokio::test]
async fn test_resolver_fast_path_skips_polling() {
    let harness = Harness::with_unresolved_character("char:1").await;
    let resolver = AssetResolver::new(
        harness.store.clone(),
        Arc::new(MockReceiptLookup {
            hit: Some(AssetId::new("asset:9")),
        }),
        harness.index.clone(),
        ResolverConfig::default(),
    );

    let resolved = resolver
        .resolve(&CharacterId::new("char:1"), &ReceiptSignature::new("rcpt:1"))
        .await
        .unwrap();
    assert_eq!(resolved, Some(AssetId::new("asset:9")));
    assert_eq!(harness.index.receipt_calls().await, 0);

    let entity = harness
        .store
        .get_character(&CharacterId::new("char:1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entity.asset_id, Some(AssetId::new("asset:9")));
}

#[tokio::test]
async fn test_resolver_polls_until_index_catches_up() {
    let harness = Harness::with_unresolved_character("char:1").await;
    harness
        .index
        .set_receipt(ReceiptSignature::new("rcpt:1"), AssetId::new("asset:9"), 3)
        .await;
    let resolver = AssetResolver::new(
        harness.store.clone(),
        Arc::new(MockReceiptLookup { hit: None }),
        harness.index.clone(),
        ResolverConfig {
            poll_attempts: 5,
            poll_interval: Duration::from_millis(1),
        },
    );

    let resolved = resolver
        .resolve(&CharacterId::new("char:1"), &ReceiptSignature::new("rcpt:1"))
        .await
        .unwrap();
    assert_eq!(resolved, Some(AssetId::new("asset:9")));
    assert_eq!(harness.index.receipt_calls().await, 3);
}

#[tokio::test]
async fn test_resolver_exhaustion_is_not_fatal() {
    let harness = Harness::with_unresolved_character("char:1").await;
    // The index never catches up inside the poll budget.
    harness
        .index
        .set_receipt(ReceiptSignature::new("rcpt:1"), AssetId::new("asset:9"), 100)
        .await;
    let resolver = AssetResolver::new(
        harness.store.clone(),
        Arc::new(MockReceiptLookup { hit: None }),
        harness.index.clone(),
        ResolverConfig {
            poll_attempts: 5,
            poll_interval: Duration::from_millis(1),
        },
    );

    let resolved = resolver
        .resolve(&CharacterId::new("char:1"), &ReceiptSignature::new("rcpt:1"))
        .await
        .unwrap();
    assert_eq!(resolved, None);
    assert_eq!(harness.index.receipt_calls().await, 5);

    // Awards still work against the unresolved character.
    harness.award("char:1", "mining", "key:1", 10).await;
    let entity = harness
        .store
        .get_character(&CharacterId::new("char:1"))
        .await
        .unwrap()
        .unwrap();
    assert!(entity.asset_id.is_none());
    assert!(entity.pending_onchain_update);
}

#[tokio::test(start_paused = true)]
async fn test_runner_start_and_stop() {
    let harness = Harness::with_resolved_character("char:1", "asset:1").await;
    let handle = harness.runner(eager_runner_config(10)).start();
    assert!(handle.is_running());

    handle.stop().await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!handle.is_running());
}

#[tokio::test]
async fn test_background_runner_converges_pending_work() {
    let harness = Harness::with_resolved_character("char:1", "asset:1").await;
    harness.award("char:1", "mining", "key:1", 100).await;

    let handle = harness.runner(eager_runner_config(10)).start();
    // First tick fires immediately; give the scan a moment to complete.
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(5)).await;
        let entity = harness
            .store
            .get_character(&CharacterId::new("char:1"))
            .await
            .unwrap()
            .unwrap();
        if !entity.pending_onchain_update {
            break;
        }
    }
    handle.stop().await;

    let entity = harness
        .store
        .get_character(&CharacterId::new("char:1"))
        .await
        .unwrap()
        .unwrap();
    assert!(!entity.pending_onchain_update);
    assert!(entity.last_committed_signature.is_some());
}
