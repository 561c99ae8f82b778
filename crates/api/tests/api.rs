//! End-to-end handler tests over an in-memory store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use prometheus_client::registry::Registry;
use serde_json::{json, Value};
use tower::ServiceExt;
use vista_api::{
    create_router, ApiMetrics, ApiState, SendFn, ENCODER_HINT, ENCODER_HINT_HEADER,
    HAL_CONTENT_TYPE, PROBLEM_CONTENT_TYPE,
};
use vista_builder::Builder;
use vista_cache::{Cache, MemoryCache};
use vista_core::{
    Address, Amount, Big, Block, CurrencyDesign, CurrencyId, CurrencyPolicy, Fact, FactRegistry,
    FactSign, FeePolicy, Height, Keys, Manifest, NetworkId, Operation, OperationOutcome,
    OperationTree, Publickey, Signature, StateDiff, TransferFact, TransferItem, B256,
};
use vista_digest::{BlockSession, Database, DigestStore};

/// Cache wrapper that counts writes, to observe hit/miss behavior.
struct CountingCache {
    inner: MemoryCache,
    sets: AtomicUsize,
}

impl CountingCache {
    fn new() -> Self {
        CountingCache {
            inner: MemoryCache::with_defaults(),
            sets: AtomicUsize::new(0),
        }
    }
}

impl Cache for CountingCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value, ttl);
    }

    fn remove(&self, key: &str) {
        self.inner.remove(key);
    }
}

fn make_operation(sender: &str, receiver: &str, token: &str) -> Operation {
    let fact = Fact::Transfer(TransferFact {
        token: token.into(),
        sender: Address::new(sender).unwrap(),
        items: vec![TransferItem {
            receiver: Address::new(receiver).unwrap(),
            amounts: vec![Amount::new(
                CurrencyId::new("VST").unwrap(),
                Big::new(10),
            )],
        }],
    });
    let sign = FactSign::new(
        Publickey::new("signer1:vpb").unwrap(),
        Signature::new("sig1").unwrap(),
        Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
    );
    Operation::new(fact, vec![sign])
}

fn make_block(height: i64, operations: Vec<Operation>, diffs: Vec<StateDiff>) -> Block {
    let mut tree = OperationTree::new();
    for op in &operations {
        tree.insert(
            op.fact_hash(),
            OperationOutcome {
                in_state: true,
                reason: None,
            },
        );
    }
    Block {
        manifest: Manifest {
            height: Height::new(height),
            hash: B256::repeat_byte(0x10 + height as u8),
            parent: B256::repeat_byte(0x10 + height.saturating_sub(1).max(0) as u8),
            operations_tree_root: B256::repeat_byte(0xaa),
            states_root: B256::repeat_byte(0xbb),
            proposed_at: Utc.timestamp_opt(1_700_000_000 + height, 0).unwrap(),
        },
        operations,
        tree,
        diffs,
    }
}

fn digest(db: &Database, block: Block) {
    let height = block.height();
    let mut session = BlockSession::new(db, block);
    session.prepare().unwrap();
    session.commit().unwrap();
    db.set_last_block(height).unwrap();
}

fn router_with(database: Arc<Database>, cache: Arc<dyn Cache>, sender: Option<SendFn>) -> Router {
    let builder = Builder::new(
        Arc::new(FactRegistry::with_defaults()),
        NetworkId::new("vista-test").unwrap(),
    );
    let state = ApiState::new(
        database,
        Arc::new(builder),
        cache,
        Arc::new(Registry::default()),
        Arc::new(ApiMetrics::new()),
        sender,
        "vista-test".into(),
        "0.0.0-test".into(),
    );
    create_router(state)
}

fn seeded_router() -> (Router, Arc<Database>) {
    let db = Arc::new(Database::new(DigestStore::in_memory().unwrap(), false));
    let design = CurrencyDesign {
        currency: CurrencyId::new("VST").unwrap(),
        genesis_amount: Big::new(1_000_000),
        policy: CurrencyPolicy {
            new_account_min_balance: Big::ZERO,
            fee: FeePolicy::Nil,
        },
    };
    let keys = Keys::new(
        vec![vista_core::AccountKey::new(
            Publickey::new("alicekey:vpb").unwrap(),
            100,
        )
        .unwrap()],
        100,
    )
    .unwrap();

    digest(
        &db,
        make_block(
            0,
            vec![make_operation("alice:vca", "bob:vca", "t0")],
            vec![
                StateDiff::Currency { design },
                StateDiff::Account {
                    address: Address::new("alice:vca").unwrap(),
                    keys,
                },
                StateDiff::Balance {
                    address: Address::new("alice:vca").unwrap(),
                    amount: Amount::new(CurrencyId::new("VST").unwrap(), Big::new(990)),
                },
            ],
        ),
    );
    digest(
        &db,
        make_block(
            1,
            vec![make_operation("alice:vca", "carol:vca", "t1")],
            vec![StateDiff::Balance {
                address: Address::new("alice:vca").unwrap(),
                amount: Amount::new(CurrencyId::new("VST").unwrap(), Big::new(980)),
            }],
        ),
    );

    let router = router_with(db.clone(), Arc::new(MemoryCache::with_defaults()), None);
    (router, db)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Option<String>, Value) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, content_type, value)
}

async fn post(router: &Router, uri: &str, body: Vec<u8>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn node_info_links_the_last_block() {
    let (router, _db) = seeded_router();
    let response = router
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        HAL_CONTENT_TYPE
    );
    assert_eq!(response.headers()[ENCODER_HINT_HEADER], ENCODER_HINT);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["_embedded"]["network"], "vista-test");
    assert_eq!(value["_embedded"]["last_block"]["height"], 1);
    assert_eq!(value["_links"]["block"]["href"], "/block/1");
}

#[tokio::test]
async fn missing_account_renders_a_problem_document() {
    let (router, _db) = seeded_router();
    let (status, content_type, value) = get(&router, "/account/ghost:vca").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(content_type.as_deref(), Some(PROBLEM_CONTENT_TYPE));
    assert_eq!(
        value["type"],
        "https://vista.network/problems/not-found"
    );
    assert!(value["detail"].as_str().unwrap().contains("ghost:vca"));
}

#[tokio::test]
async fn malformed_address_is_invalid_request() {
    let (router, _db) = seeded_router();
    let (status, _, value) = get(&router, "/account/not-an-address").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        value["type"],
        "https://vista.network/problems/invalid-request"
    );
}

#[tokio::test]
async fn account_surfaces_keys_and_balances() {
    let (router, _db) = seeded_router();
    let (status, _, value) = get(&router, "/account/alice:vca").await;

    assert_eq!(status, StatusCode::OK);
    let embedded = &value["_embedded"];
    assert_eq!(embedded["address"], "alice:vca");
    assert_eq!(embedded["height"], 1);
    assert_eq!(embedded["balances"][0]["currency"], "VST");
    assert_eq!(embedded["balances"][0]["big"], "980");
    assert_eq!(
        value["_links"]["operations"]["href"],
        "/account/alice:vca/operations"
    );
}

#[tokio::test]
async fn account_operations_carry_pagination_links() {
    let (router, _db) = seeded_router();
    let (status, _, value) = get(&router, "/account/alice:vca/operations").await;

    assert_eq!(status, StatusCode::OK);
    let items = value["_embedded"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["_embedded"]["height"], 0);
    assert_eq!(items[1]["_embedded"]["height"], 1);
    assert_eq!(
        value["_links"]["next"]["href"],
        "/account/alice:vca/operations?offset=1,0"
    );
    assert_eq!(
        value["_links"]["reverse"]["href"],
        "/account/alice:vca/operations?reverse=1"
    );

    // The page beyond the data is 404, distinguishing exhaustion from an
    // empty-but-known series.
    let (status, _, _) = get(&router, "/account/alice:vca/operations?offset=1,0").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Reverse walk flips the order.
    let (_, _, reversed) = get(&router, "/account/alice:vca/operations?reverse=1").await;
    let items = reversed["_embedded"].as_array().unwrap();
    assert_eq!(items[0]["_embedded"]["height"], 1);
    assert_eq!(items[1]["_embedded"]["height"], 0);
}

#[tokio::test]
async fn bad_offset_is_invalid_request() {
    let (router, _db) = seeded_router();
    let (status, _, value) = get(&router, "/account/alice:vca/operations?offset=zzz").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        value["type"],
        "https://vista.network/problems/invalid-request"
    );
}

#[tokio::test]
async fn operation_detail_by_fact_hash() {
    let (router, db) = seeded_router();
    let mut fact_hash = None;
    db.operations(
        vista_digest::OperationsFilter::AtHeight(Height::new(0)),
        false,
        false,
        None,
        0,
        |r| {
            fact_hash = Some(r.fact_hash);
            Ok(true)
        },
    )
    .unwrap();
    let fact_hash = fact_hash.unwrap();

    let (status, _, value) = get(&router, &format!("/operation/{fact_hash}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["_embedded"]["height"], 0);
    assert_eq!(value["_embedded"]["in_state"], true);
    assert_eq!(value["_links"]["block"]["href"], "/block/0");

    let (status, _, _) = get(&router, "/operation/nothex").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn block_and_manifest_lookup_by_height_and_hash() {
    let (router, db) = seeded_router();
    let manifest = db.manifest(Height::new(0)).unwrap().unwrap();

    let (status, _, by_height) = get(&router, "/block/0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_height["_links"]["operations"]["href"], "/block/0/operations");

    let (status, _, by_hash) = get(&router, &format!("/block/{}", manifest.hash)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_hash["_embedded"]["height"], 0);

    let (status, _, _) = get(&router, "/block/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, manifests) = get(&router, "/block/manifests").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(manifests["_embedded"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn currency_listing_and_detail() {
    let (router, _db) = seeded_router();
    let (status, _, listing) = get(&router, "/currency").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["_embedded"].as_array().unwrap().len(), 1);

    let (status, _, detail) = get(&router, "/currency/VST").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["_embedded"]["design"]["currency"], "VST");

    let (status, _, _) = get(&router, "/currency/NOPE").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn template_build_round_trip() {
    let (router, _db) = seeded_router();

    let (status, _, template) = get(&router, "/builder/fact/template/transfer").await;
    assert_eq!(status, StatusCode::OK);
    let fact = template["_embedded"].clone();
    assert_eq!(fact["kind"], "transfer");

    // Unmodified template: placeholder rejection with a specific message.
    let (status, problem) = post(
        &router,
        "/builder/fact",
        serde_json::to_vec(&fact).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        problem["detail"],
        "sender is same with template default"
    );

    // Filled in, it builds and returns the signature base.
    let mut filled = fact.clone();
    filled["sender"] = json!("alice:vca");
    filled["items"][0]["receiver"] = json!("bob:vca");
    filled["token"] = json!("wallet-token-1");
    let (status, built) = post(
        &router,
        "/builder/fact",
        serde_json::to_vec(&filled).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let base_hex = built["_extra"]["signature_base"].as_str().unwrap();
    assert!(!base_hex.is_empty());
    assert!(hex::decode(base_hex).is_ok());

    let (status, _, _) = get(&router, "/builder/fact/template/mint").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn send_requires_wiring_and_forwards_operations() {
    let (router, _db) = seeded_router();
    let op = make_operation("alice:vca", "bob:vca", "send-1");
    let body = serde_json::to_vec(&op).unwrap();

    let (status, problem) = post(&router, "/send", body.clone()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        problem["type"],
        "https://vista.network/problems/unavailable"
    );

    let db = Arc::new(Database::new(DigestStore::in_memory().unwrap(), false));
    let sender: SendFn =
        Arc::new(|_item| Box::pin(async move { Ok(json!({"status": "accepted"})) }));
    let wired = router_with(db, Arc::new(MemoryCache::with_defaults()), Some(sender));

    let (status, value) = post(&wired, "/send", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["_extra"]["response"]["status"], "accepted");
    let fact_hash = op.fact_hash();
    assert_eq!(
        value["_links"][format!("operation:{fact_hash}")]["href"],
        format!("/operation/{fact_hash}")
    );
}

#[tokio::test]
async fn identical_gets_hit_the_cache() {
    let db = Arc::new(Database::new(DigestStore::in_memory().unwrap(), false));
    digest(
        &db,
        make_block(0, vec![make_operation("alice:vca", "bob:vca", "c0")], vec![]),
    );
    let cache = Arc::new(CountingCache::new());
    let router = router_with(db, cache.clone(), None);

    let (first_status, _, first) = get(&router, "/account/alice:vca/operations").await;
    let (second_status, _, second) = get(&router, "/account/alice:vca/operations").await;

    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first, second);
    // One backend execution, one cache write; the second request replayed.
    assert_eq!(cache.sets.load(Ordering::SeqCst), 1);
}
