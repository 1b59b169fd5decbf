//! End-to-end subscription flow through the JSON-RPC dispatcher.

use chain_rpc::{
    ChainState, ConnectionId, InMemoryChainState, RpcModule, Session, SubscriptionNotification,
    SubscriptionSink,
};
use chain_rpc::domain::LimitsConfig;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

struct Client {
    session: Session,
    pushes: mpsc::UnboundedReceiver<SubscriptionNotification>,
    next_id: u64,
}

impl Client {
    fn new() -> Self {
        let (tx, pushes) = mpsc::unbounded_channel();
        let sink: Arc<dyn SubscriptionSink> = Arc::new(tx);
        Self {
            session: Session::websocket(ConnectionId::new(), sink),
            pushes,
            next_id: 1,
        }
    }

    async fn request(&mut self, module: &RpcModule, method: &str, params: Value) -> Value {
        let request = json!({
            "jsonrpc": "2.0",
            "id": self.next_id,
            "method": method,
            "params": params,
        });
        self.next_id += 1;

        let text = module.handle_text(&request.to_string(), &self.session).await;
        serde_json::from_str(&text).unwrap()
    }

    async fn push(&mut self) -> SubscriptionNotification {
        timeout(Duration::from_secs(2), self.pushes.recv())
            .await
            .expect("timed out waiting for push")
            .expect("push channel closed")
    }

    async fn assert_no_push(&mut self) {
        match timeout(Duration::from_millis(200), self.pushes.recv()).await {
            Err(_) | Ok(None) => {}
            Ok(Some(push)) => panic!("unexpected push: {:?}", push),
        }
    }
}

fn chain_at(height: usize) -> Arc<InMemoryChainState> {
    let chain = Arc::new(InMemoryChainState::with_genesis());
    for _ in 0..height {
        chain.import_block(vec![]);
    }
    chain
}

#[tokio::test]
async fn subscribe_push_unsubscribe_scenario() {
    let chain = chain_at(10);
    let module = RpcModule::new(chain.clone(), LimitsConfig::default());
    let mut client = Client::new();

    let resp = client.request(&module, "chain_subscribeNewHead", json!([])).await;
    let id = resp["result"].as_str().unwrap().to_string();

    let first = client.push().await;
    assert_eq!(first.method, "chain_newHead");
    assert_eq!(first.params.subscription, id);
    assert_eq!(first.params.result["number"], "0xa");

    chain.import_block(vec![]);
    let second = client.push().await;
    assert_eq!(second.params.subscription, id);
    assert_eq!(second.params.result["number"], "0xb");

    let resp = client
        .request(&module, "chain_unsubscribeNewHead", json!([id]))
        .await;
    assert_eq!(resp["result"], true);

    chain.import_block(vec![]);
    assert_eq!(chain.best_head().number, 12);
    client.assert_no_push().await;
}

#[tokio::test]
async fn initial_push_matches_current_header() {
    let chain = chain_at(4);
    let module = RpcModule::new(chain.clone(), LimitsConfig::default());
    let mut client = Client::new();

    let header = client.request(&module, "chain_getHeader", json!([])).await;
    client
        .request(&module, "chain_subscribeNewHeads", json!([]))
        .await;

    let push = client.push().await;
    assert_eq!(push.params.result, header["result"]);
    client.assert_no_push().await;
}

#[tokio::test]
async fn finalized_subscription_follows_finality() {
    let chain = chain_at(6);
    chain.finalize_number(3).unwrap();
    let module = RpcModule::new(chain.clone(), LimitsConfig::default());
    let mut client = Client::new();

    let resp = client
        .request(&module, "chain_subscribeFinalizedHeads", json!([]))
        .await;
    let id = resp["result"].as_str().unwrap().to_string();

    let first = client.push().await;
    assert_eq!(first.method, "chain_finalizedHead");
    assert_eq!(first.params.result["number"], "0x3");

    chain.finalize_number(5).unwrap();
    assert_eq!(client.push().await.params.result["number"], "0x5");

    // Unsubscribe names are interchangeable
    let resp = client
        .request(&module, "chain_unsubscribeNewHeads", json!([id]))
        .await;
    assert_eq!(resp["result"], true);

    chain.finalize_number(6).unwrap();
    client.assert_no_push().await;
}

#[tokio::test]
async fn double_unsubscribe_leaves_others_untouched() {
    let chain = chain_at(1);
    let module = RpcModule::new(chain.clone(), LimitsConfig::default());
    let mut a = Client::new();
    let mut b = Client::new();

    let a_id = a.request(&module, "chain_subscribeNewHead", json!([])).await["result"].clone();
    b.request(&module, "chain_subscribeNewHead", json!([])).await;
    a.push().await;
    b.push().await;

    let first = a
        .request(&module, "chain_unsubscribeNewHead", json!([a_id.clone()]))
        .await;
    let second = a
        .request(&module, "chain_unsubscribeNewHead", json!([a_id]))
        .await;
    let unknown = a
        .request(&module, "chain_unsubscribeNewHead", json!(["0xffff"]))
        .await;
    assert_eq!(first["result"], true);
    assert_eq!(second["result"], false);
    assert_eq!(unknown["result"], false);
    assert!(second.get("error").is_none());

    chain.import_block(vec![]);
    assert_eq!(b.push().await.params.result["number"], "0x2");
    a.assert_no_push().await;
}

#[tokio::test]
async fn closing_connection_drops_its_subscriptions() {
    let chain = chain_at(2);
    let module = RpcModule::new(chain.clone(), LimitsConfig::default());
    let mut client = Client::new();

    client
        .request(&module, "chain_subscribeNewHead", json!([]))
        .await;
    client
        .request(&module, "chain_subscribeFinalizedHeads", json!([]))
        .await;
    client.push().await;
    client.push().await;

    let notifier = &module.context().notifier;
    assert_eq!(notifier.remove_connection(&client.session.connection_id), 2);
    assert!(notifier.registry().is_empty());

    chain.import_block(vec![]);
    chain.finalize_number(3).unwrap();
    client.assert_no_push().await;
}

#[tokio::test]
async fn burst_of_heads_ends_on_latest() {
    let chain = chain_at(1);
    let module = RpcModule::new(chain.clone(), LimitsConfig::default());
    let mut client = Client::new();

    client
        .request(&module, "chain_subscribeNewHead", json!([]))
        .await;
    assert_eq!(client.push().await.params.result["number"], "0x1");

    for _ in 0..20 {
        chain.import_block(vec![]);
    }

    // Bursts may coalesce, but numbers only increase and end on the tip
    let mut last = 1;
    while last < 21 {
        let push = client.push().await;
        let number = push.params.result["number"].as_str().unwrap();
        let number = u64::from_str_radix(&number[2..], 16).unwrap();
        assert!(number > last);
        last = number;
    }
    client.assert_no_push().await;
}

fn push_number(push: &SubscriptionNotification) -> u64 {
    let number = push.params.result["number"].as_str().unwrap();
    u64::from_str_radix(number.trim_start_matches("0x"), 16).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn subscribe_racing_head_changes_ends_on_tip() {
    const IMPORTS: u64 = 30;

    for round in 0..100 {
        let chain = chain_at(0);
        let module = RpcModule::new(chain.clone(), LimitsConfig::default());
        let mut client = Client::new();

        let importer = {
            let chain = chain.clone();
            tokio::spawn(async move {
                for _ in 0..IMPORTS {
                    chain.import_block(vec![]);
                    tokio::task::yield_now().await;
                }
            })
        };
        client
            .request(&module, "chain_subscribeNewHead", json!([]))
            .await;
        importer.await.unwrap();

        // Strictly increasing: no duplicate and no step back
        let mut last = push_number(&client.push().await);
        while last < IMPORTS {
            let number = push_number(&client.push().await);
            assert!(number > last, "round {}: {} after {}", round, number, last);
            last = number;
        }
        assert_eq!(last, IMPORTS);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(client.pushes.try_recv().is_err(), "round {}: push after tip", round);
    }
}
