//! Scripted HTTP mock
//!
//! Tests queue responses per (method, url fragment) rule; the mock records
//! every request so assertions can check exact traffic. The last queued
//! response of a rule repeats, which makes polling endpoints trivial to
//! script.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use stagelink_ports::{HttpError, HttpMethod, HttpPort, HttpRequest, HttpResponse};

struct Rule {
    method: HttpMethod,
    url_fragment: String,
    responses: VecDeque<HttpResponse>,
}

#[derive(Default)]
struct State {
    rules: Vec<Rule>,
    requests: Vec<HttpRequest>,
}

/// Scripted `HttpPort` for tests.
#[derive(Clone, Default)]
pub struct ScriptedHttpPort {
    state: Arc<Mutex<State>>,
}

impl ScriptedHttpPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue responses for every request whose URL contains `url_fragment`.
    pub fn on(&self, method: HttpMethod, url_fragment: &str, responses: &[(u16, &str)]) {
        let mut state = self.state.lock().unwrap();
        state.rules.push(Rule {
            method,
            url_fragment: url_fragment.to_string(),
            responses: responses
                .iter()
                .map(|(status, body)| HttpResponse {
                    status: *status,
                    body: body.to_string(),
                })
                .collect(),
        });
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Number of requests whose URL contains `url_fragment`.
    pub fn count_matching(&self, url_fragment: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|r| r.url.contains(url_fragment))
            .count()
    }
}

#[async_trait]
impl HttpPort for ScriptedHttpPort {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(request.clone());

        let rule = state
            .rules
            .iter_mut()
            .find(|r| r.method == request.method && request.url.contains(&r.url_fragment));
        match rule {
            Some(rule) => {
                let response = if rule.responses.len() > 1 {
                    rule.responses.pop_front()
                } else {
                    rule.responses.front().cloned()
                };
                response.ok_or_else(|| {
                    HttpError::Network(format!("rule for {} has no responses", request.url))
                })
            }
            None => Err(HttpError::Network(format!(
                "no scripted response for {}",
                request.url
            ))),
        }
    }
}
