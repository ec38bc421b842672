//! Minimal Ethereum JSON-RPC node for exercising the HTTP provider paths.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{extract::State, routing::post, Json, Router};
use ethers::{
    abi::{self, Token},
    types::Bytes,
};
use ptp_common::{Address, U256};
use serde_json::{json, Value};
use tokio::{net::TcpListener, task::JoinHandle};

/// What the stub node answers with. Mutable while the stub runs.
#[derive(Clone, Debug)]
pub struct RpcState {
    pub accounts: Vec<Address>,
    pub balances: HashMap<Address, U256>,
    pub chain_id: u64,
    /// Answer `eth_requestAccounts` with EIP-1193 code 4001.
    pub reject_requests: bool,
    /// When false `eth_requestAccounts` is an unknown method.
    pub request_accounts_supported: bool,
    /// Return value of every `eth_call`.
    pub call_verdict: bool,
    /// Make `eth_call` revert.
    pub revert_calls: bool,
    pub last_call_to: Option<Address>,
    pub last_call_data: Option<Bytes>,
    /// Every method received, in order.
    pub methods: Vec<String>,
}

impl Default for RpcState {
    fn default() -> Self {
        Self {
            accounts: Vec::new(),
            balances: HashMap::new(),
            chain_id: 1,
            reject_requests: false,
            request_accounts_supported: true,
            call_verdict: true,
            revert_calls: false,
            last_call_to: None,
            last_call_data: None,
            methods: Vec::new(),
        }
    }
}

type SharedState = Arc<Mutex<RpcState>>;

pub struct RpcStub {
    url: String,
    state: SharedState,
    server: JoinHandle<()>,
}

impl RpcStub {
    /// Serve `state` on an ephemeral local port.
    pub async fn spawn(state: RpcState) -> Self {
        let state: SharedState = Arc::new(Mutex::new(state));
        let app = Router::new().route("/", post(handle)).with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind rpc stub listener");
        let url = format!("http://{}", listener.local_addr().expect("rpc stub address"));
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { url, state, server }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn update(&self, change: impl FnOnce(&mut RpcState)) {
        change(&mut self.state.lock().unwrap());
    }

    pub fn state(&self) -> RpcState {
        self.state.lock().unwrap().clone()
    }

    /// How often `method` was called.
    pub fn calls(&self, method: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .methods
            .iter()
            .filter(|m| m.as_str() == method)
            .count()
    }
}

impl Drop for RpcStub {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn handle(State(state): State<SharedState>, Json(request): Json<Value>) -> Json<Value> {
    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let method = request
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let params = request.get("params").cloned().unwrap_or(Value::Null);

    let mut state = state.lock().unwrap();
    state.methods.push(method.clone());

    let outcome = match method.as_str() {
        "eth_requestAccounts" if !state.request_accounts_supported => Err((-32601, "method not found")),
        "eth_requestAccounts" if state.reject_requests => Err((4001, "User rejected the request.")),
        "eth_requestAccounts" | "eth_accounts" => Ok(json!(state.accounts)),
        "eth_chainId" => Ok(json!(format!("{:#x}", state.chain_id))),
        "eth_getBalance" => {
            let balance = params
                .get(0)
                .and_then(|raw| serde_json::from_value::<Address>(raw.clone()).ok())
                .and_then(|address| state.balances.get(&address).copied())
                .unwrap_or_default();
            Ok(json!(balance))
        }
        "eth_call" if state.revert_calls => Err((-32000, "execution reverted")),
        "eth_call" => {
            let call = params.get(0).cloned().unwrap_or(Value::Null);
            state.last_call_to = call
                .get("to")
                .and_then(|raw| serde_json::from_value(raw.clone()).ok());
            state.last_call_data = call
                .get("data")
                .or_else(|| call.get("input"))
                .and_then(|raw| serde_json::from_value(raw.clone()).ok());
            let output = abi::encode(&[Token::Bool(state.call_verdict)]);
            Ok(json!(Bytes::from(output)))
        }
        _ => Err((-32601, "method not found")),
    };

    Json(match outcome {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err((code, message)) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": code, "message": message },
        }),
    })
}
