#![allow(dead_code)]

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::{json, Value};
use tiny_http::{Method, Response, Server, StatusCode};

pub type Recorded = Arc<Mutex<Vec<(String, Value)>>>;

/// JSON-RPC server answering each call through `handler(method, params)`.
/// Returns the base url and the recorded `(method, params)` pairs.
pub fn spawn_rpc_server<F>(handler: F) -> (String, Recorded)
where
    F: Fn(&str, &Value) -> (u16, Value) + Send + 'static,
{
    let server = Server::http("127.0.0.1:0").expect("start server");
    let addr = format!("http://{}", server.server_addr());
    let calls: Recorded = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&calls);

    thread::spawn(move || {
        for mut req in server.incoming_requests() {
            if *req.method() != Method::Post {
                let _ = req.respond(Response::from_string("").with_status_code(StatusCode(405)));
                continue;
            }
            let mut body = String::new();
            if req.as_reader().read_to_string(&mut body).is_err() {
                let _ = req.respond(Response::from_string("").with_status_code(StatusCode(400)));
                continue;
            }
            let request: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
            let method = request["method"].as_str().unwrap_or_default().to_owned();
            let params = request["params"].clone();
            if let Ok(mut g) = recorded.lock() {
                g.push((method.clone(), params.clone()));
            }

            let (code, payload) = handler(&method, &params);
            let envelope = if payload.get("error").is_some() {
                json!({"jsonrpc": "2.0", "id": request["id"], "error": payload["error"]})
            } else {
                json!({"jsonrpc": "2.0", "id": request["id"], "result": payload})
            };
            let response =
                Response::from_string(envelope.to_string()).with_status_code(StatusCode(code));
            let _ = req.respond(response);
        }
    });

    (addr, calls)
}

pub fn rpc_error(code: i64, message: &str) -> Value {
    json!({"error": {"code": code, "message": message}})
}

pub fn methods(calls: &Recorded) -> Vec<String> {
    calls
        .lock()
        .expect("calls lock")
        .iter()
        .map(|(m, _)| m.clone())
        .collect()
}

pub fn params_of(calls: &Recorded, method: &str) -> Option<Value> {
    calls
        .lock()
        .expect("calls lock")
        .iter()
        .find(|(m, _)| m == method)
        .map(|(_, p)| p.clone())
}
