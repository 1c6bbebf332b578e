use super::*;
use ethers_core::{abi::Token, types::U256};
use std::time::Duration;
use tokio::sync::oneshot;

const ACCOUNT: &str = "0xABCDef0123456789abcdef0123456789ABcd1234";
const OTHER_ACCOUNT: &str = "0x1111111111111111111111111111111111112222";
const TX_HASH: &str = "0xdeadbeef00000000000000000000000000000000000000000000000000beef";

struct MockWallet {
    accounts: Mutex<std::result::Result<Vec<String>, String>>,
    accounts_tx: broadcast::Sender<Vec<String>>,
    signer_error: Option<String>,
    call_error: Option<String>,
    confirm_error: Option<String>,
    confirm_gate: Mutex<Option<oneshot::Receiver<()>>>,
    signer_requests: Arc<Mutex<u32>>,
    calls: Arc<Mutex<Vec<ContractCall>>>,
}

impl MockWallet {
    fn with_accounts(accounts: &[&str]) -> Self {
        Self {
            accounts: Mutex::new(Ok(accounts.iter().map(|a| a.to_string()).collect())),
            accounts_tx: broadcast::channel(16).0,
            signer_error: None,
            call_error: None,
            confirm_error: None,
            confirm_gate: Mutex::new(None),
            signer_requests: Arc::new(Mutex::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn rejecting_accounts(message: &str) -> Self {
        let wallet = Self::with_accounts(&[]);
        *wallet.accounts.try_lock().expect("fresh lock") = Err(message.to_string());
        wallet
    }
}

struct MockSigner {
    call_error: Option<String>,
    calls: Arc<Mutex<Vec<ContractCall>>>,
}

#[async_trait]
impl TipSigner for MockSigner {
    async fn call(&self, call: ContractCall) -> Result<PendingTip> {
        self.calls.lock().await.push(call);
        if let Some(err) = &self.call_error {
            return Err(anyhow!(err.clone()));
        }
        Ok(PendingTip {
            hash: TxHash::from(TX_HASH),
        })
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn request_accounts(&self) -> Result<Vec<String>> {
        self.accounts.lock().await.clone().map_err(|err| anyhow!(err))
    }

    fn subscribe_accounts_changed(&self) -> broadcast::Receiver<Vec<String>> {
        self.accounts_tx.subscribe()
    }

    async fn get_signer(&self) -> Result<Arc<dyn TipSigner>> {
        *self.signer_requests.lock().await += 1;
        if let Some(err) = &self.signer_error {
            return Err(anyhow!(err.clone()));
        }
        Ok(Arc::new(MockSigner {
            call_error: self.call_error.clone(),
            calls: self.calls.clone(),
        }))
    }

    async fn wait_for_confirmation(&self, tx_hash: &TxHash) -> Result<TipReceipt> {
        let gate = self.confirm_gate.lock().await.take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if let Some(err) = &self.confirm_error {
            return Err(anyhow!(err.clone()));
        }
        Ok(TipReceipt {
            tx_hash: tx_hash.clone(),
            block_number: Some(19_000_000),
        })
    }
}

fn client_with(wallet: Arc<MockWallet>) -> Arc<TipClient> {
    let provider: Arc<dyn WalletProvider> = wallet;
    TipClient::new(Some(provider), TipSettings::default()).expect("client")
}

async fn connected_client(wallet: Arc<MockWallet>) -> Arc<TipClient> {
    let client = client_with(wallet);
    client.connect().await.expect("connect");
    assert!(client.snapshot().await.wallet.is_connected());
    client
}

async fn collect_until_settled(
    rx: &mut broadcast::Receiver<TipClientEvent>,
) -> Vec<TipClientSnapshot> {
    tokio::time::timeout(Duration::from_secs(1), async {
        let mut seen = Vec::new();
        loop {
            match rx.recv().await.expect("event") {
                TipClientEvent::StateChanged(snapshot) => {
                    let settled = snapshot.status().is_settled();
                    seen.push(snapshot);
                    if settled {
                        break seen;
                    }
                }
                TipClientEvent::Prompt(prompt) => panic!("unexpected prompt: {prompt}"),
            }
        }
    })
    .await
    .expect("tip did not settle")
}

#[tokio::test]
async fn connect_without_provider_prompts() {
    let client = TipClient::new(None, TipSettings::default()).expect("client");
    let mut rx = client.subscribe_events();

    let err = client.connect().await.expect_err("no provider");
    assert_eq!(err, PromptError::ProviderMissing);
    assert_eq!(err.to_string(), "Please install MetaMask.");
    assert!(matches!(
        rx.recv().await.expect("event"),
        TipClientEvent::Prompt(PromptError::ProviderMissing)
    ));
    assert!(!client.snapshot().await.wallet.is_connected());
}

#[tokio::test]
async fn connect_uses_first_account_and_abbreviates_status() {
    let wallet = Arc::new(MockWallet::with_accounts(&[ACCOUNT, OTHER_ACCOUNT]));
    let client = client_with(wallet);

    client.connect().await.expect("connect");

    let snapshot = client.snapshot().await;
    assert_eq!(snapshot.wallet.account, Some(Account::from(ACCOUNT)));
    assert_eq!(snapshot.status_text, "Wallet connected: 0xABCD...1234");
    assert_eq!(snapshot.status(), TxStatus::Idle);
}

#[tokio::test]
async fn connect_rejection_is_reported_in_status() {
    let wallet = Arc::new(MockWallet::rejecting_accounts("User rejected the request."));
    let client = client_with(wallet);

    client.connect().await.expect("rejection is not a prompt");

    let snapshot = client.snapshot().await;
    assert!(!snapshot.wallet.is_connected());
    assert_eq!(snapshot.status_text, "Connect error: User rejected the request.");
}

#[tokio::test]
async fn connect_with_empty_account_list_stays_disconnected() {
    let wallet = Arc::new(MockWallet::with_accounts(&[]));
    let client = client_with(wallet);

    client.connect().await.expect("connect");

    let snapshot = client.snapshot().await;
    assert!(!snapshot.wallet.is_connected());
    assert_eq!(snapshot.status_text, "Connect error: no accounts returned");
}

#[tokio::test]
async fn connecting_twice_updates_account() {
    let wallet = Arc::new(MockWallet::with_accounts(&[ACCOUNT]));
    let client = connected_client(wallet.clone()).await;

    *wallet.accounts.lock().await = Ok(vec![OTHER_ACCOUNT.to_string()]);
    client.connect().await.expect("second connect");

    let snapshot = client.snapshot().await;
    assert_eq!(snapshot.wallet.account, Some(Account::from(OTHER_ACCOUNT)));
    assert_eq!(snapshot.status_text, "Wallet connected: 0x1111...2222");
}

#[tokio::test]
async fn account_change_events_follow_the_wallet() {
    let wallet = Arc::new(MockWallet::with_accounts(&[ACCOUNT]));
    let client = client_with(wallet.clone());
    let mut rx = client.subscribe_events();

    wallet
        .accounts_tx
        .send(vec![OTHER_ACCOUNT.to_string()])
        .expect("listener subscribed");
    let connected = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("event timeout")
        .expect("event");
    match connected {
        TipClientEvent::StateChanged(snapshot) => {
            assert_eq!(snapshot.wallet.account, Some(Account::from(OTHER_ACCOUNT)));
        }
        other => panic!("unexpected event {other:?}"),
    }

    wallet.accounts_tx.send(Vec::new()).expect("listener subscribed");
    let disconnected = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("event timeout")
        .expect("event");
    match disconnected {
        TipClientEvent::StateChanged(snapshot) => assert!(!snapshot.wallet.is_connected()),
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn dropping_the_client_ends_the_account_subscription() {
    let wallet = Arc::new(MockWallet::with_accounts(&[ACCOUNT]));
    let client = client_with(wallet.clone());
    assert_eq!(wallet.accounts_tx.receiver_count(), 1);

    drop(client);

    let released = tokio::time::timeout(Duration::from_secs(1), async {
        while wallet.accounts_tx.receiver_count() > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(released.is_ok(), "listener still subscribed after drop");
}

#[tokio::test]
async fn send_tip_requires_connection() {
    let wallet = Arc::new(MockWallet::with_accounts(&[ACCOUNT]));
    let client = client_with(wallet.clone());

    let err = client.send_tip().await.expect_err("not connected");
    assert_eq!(err, PromptError::NotConnected);
    assert_eq!(*wallet.signer_requests.lock().await, 0);
    assert_eq!(client.snapshot().await.status(), TxStatus::Idle);
}

#[tokio::test]
async fn invalid_amounts_never_reach_the_wallet() {
    let wallet = Arc::new(MockWallet::with_accounts(&[ACCOUNT]));
    let settings = TipSettings {
        default_amount: String::new(),
        ..TipSettings::default()
    };
    let provider: Arc<dyn WalletProvider> = wallet.clone();
    let client = TipClient::new(Some(provider), settings).expect("client");
    client.connect().await.expect("connect");

    for amount in ["", "0", "-1", "abc", "  ", "0.0"] {
        client.set_amount(amount).await;
        let err = client.send_tip().await.expect_err("invalid amount");
        assert!(
            matches!(err, PromptError::InvalidAmount(_)),
            "{amount:?} gave {err:?}"
        );
    }

    assert_eq!(*wallet.signer_requests.lock().await, 0);
    assert!(wallet.calls.lock().await.is_empty());
    assert_eq!(client.snapshot().await.status(), TxStatus::Idle);
}

#[tokio::test]
async fn successful_tip_moves_through_each_status_once() {
    let wallet = Arc::new(MockWallet::with_accounts(&[ACCOUNT]));
    let client = connected_client(wallet.clone()).await;
    let mut rx = client.subscribe_events();

    client.send_tip().await.expect("send");

    let seen = collect_until_settled(&mut rx).await;
    let statuses: Vec<TxStatus> = seen.iter().map(TipClientSnapshot::status).collect();
    assert_eq!(
        statuses,
        vec![
            TxStatus::Sending,
            TxStatus::WaitingConfirmation,
            TxStatus::Confirmed
        ]
    );
    assert_eq!(seen[0].status_text, STATUS_SENDING);
    assert!(seen[0].tx_hash().is_none());
    assert_eq!(seen[1].status_text, STATUS_WAITING);
    assert_eq!(seen[1].tx_hash(), Some(&TxHash::from(TX_HASH)));
    assert_eq!(seen[2].status_text, STATUS_CONFIRMED);

    let calls = wallet.calls.lock().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, "tip");
    assert_eq!(calls[0].args, vec![Token::String("Thanks!".to_string())]);
    assert_eq!(calls[0].value, U256::from(1_000_000_000_000u64));
    assert_eq!(
        format!("{:#x}", calls[0].contract),
        client.contract_address()
    );
}

#[tokio::test]
async fn custom_message_and_amount_are_sent_and_message_is_cleared() {
    let wallet = Arc::new(MockWallet::with_accounts(&[ACCOUNT]));
    let client = connected_client(wallet.clone()).await;
    client.set_message("gm from the desk").await;
    client.set_amount(" 0.01 ").await;

    client.send_tip().await.expect("send");

    let calls = wallet.calls.lock().await;
    assert_eq!(
        calls[0].args,
        vec![Token::String("gm from the desk".to_string())]
    );
    assert_eq!(calls[0].value, U256::from(10_000_000_000_000_000u64));

    let snapshot = client.snapshot().await;
    assert_eq!(snapshot.status(), TxStatus::Confirmed);
    assert!(snapshot.draft.message.is_empty());
    assert_eq!(snapshot.draft.amount, " 0.01 ");
}

#[tokio::test]
async fn rejected_submission_fails_without_hash() {
    let mut wallet = MockWallet::with_accounts(&[ACCOUNT]);
    wallet.call_error = Some("user rejected".to_string());
    let wallet = Arc::new(wallet);
    let client = connected_client(wallet.clone()).await;
    client.set_message("keep me").await;
    let mut rx = client.subscribe_events();

    client.send_tip().await.expect("failure is not a prompt");

    let seen = collect_until_settled(&mut rx).await;
    let statuses: Vec<TxStatus> = seen.iter().map(TipClientSnapshot::status).collect();
    assert_eq!(
        statuses,
        vec![
            TxStatus::Sending,
            TxStatus::Failed("user rejected".to_string())
        ]
    );

    let snapshot = client.snapshot().await;
    assert!(snapshot.tx_hash().is_none());
    assert_eq!(snapshot.status_text, "Error: user rejected");
    assert_eq!(snapshot.draft.message, "keep me");
}

#[tokio::test]
async fn signer_refusal_fails_before_any_call() {
    let mut wallet = MockWallet::with_accounts(&[ACCOUNT]);
    wallet.signer_error = Some("wallet locked".to_string());
    let wallet = Arc::new(wallet);
    let client = connected_client(wallet.clone()).await;

    client.send_tip().await.expect("send");

    assert_eq!(
        client.snapshot().await.status(),
        TxStatus::Failed("wallet locked".to_string())
    );
    assert!(wallet.calls.lock().await.is_empty());
}

#[tokio::test]
async fn confirmation_failure_keeps_the_pending_hash() {
    let mut wallet = MockWallet::with_accounts(&[ACCOUNT]);
    wallet.confirm_error = Some("execution reverted".to_string());
    let wallet = Arc::new(wallet);
    let client = connected_client(wallet).await;

    client.send_tip().await.expect("send");

    let snapshot = client.snapshot().await;
    assert_eq!(
        snapshot.status(),
        TxStatus::Failed("execution reverted".to_string())
    );
    assert_eq!(snapshot.tx_hash(), Some(&TxHash::from(TX_HASH)));
    assert_eq!(snapshot.status_text, "Error: execution reverted");
}

#[tokio::test]
async fn second_tip_is_rejected_while_first_is_in_flight() {
    let wallet = Arc::new(MockWallet::with_accounts(&[ACCOUNT]));
    let (release, gate) = oneshot::channel();
    *wallet.confirm_gate.lock().await = Some(gate);
    let client = connected_client(wallet.clone()).await;
    let mut rx = client.subscribe_events();

    let first = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.send_tip().await })
    };

    tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            if let TipClientEvent::StateChanged(snapshot) = rx.recv().await.expect("event") {
                if snapshot.status() == TxStatus::WaitingConfirmation {
                    break;
                }
            }
        }
    })
    .await
    .expect("waiting for confirmation");

    assert_eq!(
        client.send_tip().await.expect_err("in flight"),
        PromptError::TipInFlight
    );

    release.send(()).expect("release confirmation");
    first.await.expect("join").expect("first tip");

    assert_eq!(client.snapshot().await.status(), TxStatus::Confirmed);
    assert_eq!(wallet.calls.lock().await.len(), 1);
}

#[tokio::test]
async fn a_new_tip_can_follow_a_failed_one() {
    let mut wallet = MockWallet::with_accounts(&[ACCOUNT]);
    wallet.confirm_error = Some("dropped".to_string());
    let wallet = Arc::new(wallet);
    let client = connected_client(wallet.clone()).await;

    client.send_tip().await.expect("first");
    let first_id = client
        .snapshot()
        .await
        .attempt
        .map(|attempt| attempt.id)
        .expect("first attempt");
    client.send_tip().await.expect("second");

    let snapshot = client.snapshot().await;
    assert_ne!(snapshot.attempt.map(|attempt| attempt.id), Some(first_id));
    assert_eq!(wallet.calls.lock().await.len(), 2);
}

#[tokio::test]
async fn invalid_contract_address_is_rejected_up_front() {
    let settings = TipSettings {
        contract_address: "not-an-address".to_string(),
        ..TipSettings::default()
    };
    assert!(matches!(
        TipClient::new(None, settings),
        Err(ContractError::Address { .. })
    ));
}

#[tokio::test]
async fn tip_in_flight_keeps_its_draft_when_another_is_submitted() {
    let wallet = Arc::new(MockWallet::with_accounts(&[ACCOUNT]));
    let (release, gate) = oneshot::channel();
    *wallet.confirm_gate.lock().await = Some(gate);
    let client = connected_client(wallet.clone()).await;
    let mut rx = client.subscribe_events();

    let first = {
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            client
                .send_tip_with(TipDraft {
                    message: "first".to_string(),
                    amount: "0.001".to_string(),
                })
                .await
        })
    };

    tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            if let TipClientEvent::StateChanged(snapshot) = rx.recv().await.expect("event") {
                if snapshot.status() == TxStatus::WaitingConfirmation {
                    break;
                }
            }
        }
    })
    .await
    .expect("waiting for confirmation");

    let second = client
        .send_tip_with(TipDraft {
            message: "second".to_string(),
            amount: "0.5".to_string(),
        })
        .await;
    assert_eq!(second, Err(PromptError::TipInFlight));
    assert_eq!(
        client.snapshot().await.draft,
        TipDraft {
            message: "first".to_string(),
            amount: "0.001".to_string(),
        }
    );

    release.send(()).expect("release confirmation");
    first.await.expect("join").expect("first tip");

    let calls = wallet.calls.lock().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].args, vec![Token::String("first".to_string())]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn published_snapshots_follow_state_order_under_concurrent_updates() {
    for _ in 0..20 {
        let wallet = Arc::new(MockWallet::with_accounts(&[ACCOUNT]));
        let (release, gate) = oneshot::channel();
        *wallet.confirm_gate.lock().await = Some(gate);
        let client = connected_client(wallet).await;
        let mut rx = client.subscribe_events();

        let tip = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.send_tip().await })
        };
        while client.snapshot().await.status() != TxStatus::WaitingConfirmation {
            tokio::task::yield_now().await;
        }

        let switches: Vec<_> = (0..16)
            .map(|i| {
                let client = Arc::clone(&client);
                let account = if i % 2 == 0 { ACCOUNT } else { OTHER_ACCOUNT };
                tokio::spawn(async move {
                    client.handle_accounts_changed(vec![account.to_string()]).await;
                })
            })
            .collect();
        release.send(()).expect("release confirmation");

        tip.await.expect("join").expect("tip");
        for switch in switches {
            switch.await.expect("join");
        }

        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            if let TipClientEvent::StateChanged(snapshot) = event {
                last = Some(snapshot);
            }
        }
        let last = last.expect("published snapshot");
        assert_eq!(last.status(), TxStatus::Confirmed);
        assert_eq!(last, client.snapshot().await);
    }
}

#[tokio::test]
async fn queued_events_are_delivered_before_the_stream_closes() {
    let wallet = Arc::new(MockWallet::with_accounts(&[ACCOUNT]));
    let client = client_with(wallet);
    let mut rx = client.subscribe_events();

    client.connect().await.expect("connect");
    client.send_tip().await.expect("send");
    drop(client);

    let mut statuses = Vec::new();
    loop {
        match rx.recv().await {
            Ok(TipClientEvent::StateChanged(snapshot)) => statuses.push(snapshot.status_text),
            Ok(TipClientEvent::Prompt(prompt)) => panic!("unexpected prompt {prompt}"),
            Err(broadcast::error::RecvError::Closed) => break,
            Err(err) => panic!("unexpected receive error {err}"),
        }
    }
    assert_eq!(
        statuses,
        vec![
            "Wallet connected: 0xABCD...1234".to_string(),
            STATUS_SENDING.to_string(),
            STATUS_WAITING.to_string(),
            STATUS_CONFIRMED.to_string(),
        ]
    );
}
