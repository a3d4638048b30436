//! Onboarding state machine
//!
//! One [`LoginWorkflow`] drives a single onboarding attempt against one
//! gateway:
//!
//! ```text
//! Idle -> Probing -> CaptchaPending -> LoggingIn -> LoggedIn -> FetchingDdns -> Ready
//!                 \______________________/
//! ```
//!
//! Every step can end in `Error`. `Ready` and `Error` are terminal; a new
//! attempt needs a new workflow. Failures are reported as data in
//! [`WorkflowState::Error`], except an invalidated session, which is also
//! returned once as [`WorkflowError::SessionInvalidated`] so the top-level
//! caller can prompt for a fresh login.

use crate::captcha::{self, CaptchaChallenge, CaptchaDecision};
use crate::error::GatewayError;
use crate::protocol::{Credentials, GatewayClient, LoginCredentials};
use crate::public_ip::{public_ip_or_unknown, PublicIpLookup};
use crate::record::{assemble, DdnsOutcome, DeviceForm, DeviceRecord, LoginInputs};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug)]
pub enum WorkflowState {
    Idle,
    Probing,
    /// Waiting for the user to read this challenge
    CaptchaPending(CaptchaChallenge),
    LoggingIn,
    /// Gateway accepted these inputs
    LoggedIn(LoginInputs),
    FetchingDdns,
    Ready(Onboarded),
    Error(GatewayError),
}

impl WorkflowState {
    pub fn kind(&self) -> StateKind {
        match self {
            Self::Idle => StateKind::Idle,
            Self::Probing => StateKind::Probing,
            Self::CaptchaPending(_) => StateKind::CaptchaPending,
            Self::LoggingIn => StateKind::LoggingIn,
            Self::LoggedIn(_) => StateKind::LoggedIn,
            Self::FetchingDdns => StateKind::FetchingDdns,
            Self::Ready(_) => StateKind::Ready,
            Self::Error(_) => StateKind::Error,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready(_) | Self::Error(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    Idle,
    Probing,
    CaptchaPending,
    LoggingIn,
    LoggedIn,
    FetchingDdns,
    Ready,
    Error,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Probing => "probing",
            Self::CaptchaPending => "waiting for captcha",
            Self::LoggingIn => "logging in",
            Self::LoggedIn => "logged in",
            Self::FetchingDdns => "fetching DDNS",
            Self::Ready => "ready",
            Self::Error => "failed",
        };
        f.write_str(name)
    }
}

/// Successful end of a workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Onboarded {
    pub record: DeviceRecord,
    pub login: LoginInputs,
    pub ddns: DdnsOutcome,
}

impl Onboarded {
    /// False when the gateway has no DDNS entry and the user should enter one
    pub fn ddns_known(&self) -> bool {
        self.ddns.is_known()
    }

    /// Rebuild the record after the user filled in more fields
    pub fn reassemble(&self, form: &DeviceForm) -> DeviceRecord {
        assemble(&self.login, &self.ddns, form)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// The gateway dropped the session; prompt for a new login
    #[error("gateway session invalidated, please log in again")]
    SessionInvalidated,

    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: StateKind,
    },
}

pub type Step<'a> = Result<&'a WorkflowState, WorkflowError>;

pub struct LoginWorkflow {
    client: GatewayClient,
    ip_lookup: Arc<dyn PublicIpLookup>,
    form: DeviceForm,
    credentials: Option<Credentials>,
    state: WorkflowState,
    history: Vec<StateKind>,
}

impl LoginWorkflow {
    /// `form` holds the user's name/port/extended fields for the final record
    pub fn new(client: GatewayClient, ip_lookup: Arc<dyn PublicIpLookup>, form: DeviceForm) -> Self {
        Self {
            client,
            ip_lookup,
            form,
            credentials: None,
            state: WorkflowState::Idle,
            history: vec![StateKind::Idle],
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Every state this workflow has been in, oldest first
    pub fn history(&self) -> &[StateKind] {
        &self.history
    }

    pub fn address(&self) -> &str {
        self.client.address()
    }

    /// Probe the gateway, then log in directly or stop at `CaptchaPending`
    pub async fn start(&mut self, credentials: Credentials) -> Step<'_> {
        self.expect(StateKind::Idle, "start")?;
        tracing::info!("[{}] Step 1: Probing login requirements...", self.address());
        self.transition(WorkflowState::Probing);

        let decision = captcha::probe_requirement(&self.client).await;
        match decision {
            Ok(CaptchaDecision::NotRequired) => {
                self.login(LoginCredentials::without_captcha(credentials)).await
            }
            Ok(CaptchaDecision::Required(challenge)) => {
                tracing::info!("   -> Captcha image: {}", challenge.display_url());
                self.credentials = Some(credentials);
                self.transition(WorkflowState::CaptchaPending(challenge));
                Ok(&self.state)
            }
            Err(e) => self.fail(e),
        }
    }

    /// Answer the pending captcha with the credentials given to `start`
    pub async fn submit(&mut self, answer: &str) -> Step<'_> {
        self.expect(StateKind::CaptchaPending, "submit a captcha answer")?;
        match self.credentials.take() {
            Some(credentials) => self.submit_with(credentials, answer).await,
            None => Err(WorkflowError::InvalidTransition {
                action: "submit without credentials",
                state: self.state.kind(),
            }),
        }
    }

    /// Answer the pending captcha with corrected credentials
    pub async fn submit_with(&mut self, credentials: Credentials, answer: &str) -> Step<'_> {
        let challenge = match std::mem::replace(&mut self.state, WorkflowState::LoggingIn) {
            WorkflowState::CaptchaPending(challenge) => challenge,
            other => return Err(self.restore(other, "submit a captcha answer")),
        };
        self.credentials = None;
        self.login(LoginCredentials::with_captcha(credentials, challenge.answer(answer)))
            .await
    }

    /// Look up the external IP and DDNS entries, then assemble the record
    pub async fn fetch_ddns(&mut self) -> Step<'_> {
        let login = match std::mem::replace(&mut self.state, WorkflowState::FetchingDdns) {
            WorkflowState::LoggedIn(login) => login,
            other => return Err(self.restore(other, "fetch DDNS")),
        };

        tracing::info!("[{}] Step 3: Fetching DDNS configuration...", self.address());
        self.transition(WorkflowState::FetchingDdns);

        let external_ip = public_ip_or_unknown(self.ip_lookup.as_ref()).await;
        let fetched = self.client.ddns_config().await;
        let records = match fetched {
            Ok(records) => records,
            Err(e) => return self.fail(e),
        };

        let ddns = DdnsOutcome {
            external_ip,
            record: records.into_iter().next(),
        };
        match ddns.ddns_address() {
            Some(host) => tracing::info!("   -> DDNS registered: {}", host),
            None => tracing::info!("   -> No DDNS registered, manual entry needed"),
        }

        let record = assemble(&login, &ddns, &self.form);
        self.transition(WorkflowState::Ready(Onboarded {
            record,
            login,
            ddns,
        }));
        Ok(&self.state)
    }

    /// Abandon the attempt; a pending challenge is dropped with the workflow
    pub fn cancel(self) {
        tracing::info!("[{}] Onboarding abandoned while {}", self.address(), self.state.kind());
    }

    async fn login(&mut self, credentials: LoginCredentials) -> Step<'_> {
        tracing::info!("[{}] Step 2: Logging in as {}...", self.address(), credentials.id);
        self.transition(WorkflowState::LoggingIn);

        let outcome = self.client.login(&credentials).await;
        match outcome {
            Ok(()) => {
                tracing::debug!(
                    "[{}] session cookie stored: {}",
                    self.address(),
                    self.client.session().has_cookies()
                );
                self.transition(WorkflowState::LoggedIn(LoginInputs {
                    ip_address: self.client.address().to_string(),
                    login_id: credentials.id,
                    password: credentials.password,
                }));
                Ok(&self.state)
            }
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, err: GatewayError) -> Step<'_> {
        tracing::error!("[{}] Onboarding failed: {}", self.client.address(), err);
        let invalidated = err.is_unauthenticated();
        self.credentials = None;
        self.transition(WorkflowState::Error(err));
        if invalidated {
            Err(WorkflowError::SessionInvalidated)
        } else {
            Ok(&self.state)
        }
    }

    fn expect(&self, kind: StateKind, action: &'static str) -> Result<(), WorkflowError> {
        if self.state.kind() == kind {
            Ok(())
        } else {
            Err(WorkflowError::InvalidTransition {
                action,
                state: self.state.kind(),
            })
        }
    }

    /// Put back a state taken out for a transition that does not apply to it
    fn restore(&mut self, state: WorkflowState, action: &'static str) -> WorkflowError {
        let kind = state.kind();
        self.state = state;
        WorkflowError::InvalidTransition { action, state: kind }
    }

    // `state` may be a placeholder here; the last history entry is the real origin
    fn transition(&mut self, next: WorkflowState) {
        let from = self.history.last().copied().unwrap_or(StateKind::Idle);
        tracing::debug!("[{}] {} -> {}", self.client.address(), from, next.kind());
        self.history.push(next.kind());
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::protocol::tests::{client_for, rpc};
    use async_trait::async_trait;
    use mockito::{Matcher, Mock, Server};
    use serde_json::json;
    use std::net::IpAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CAPTCHA_ERROR: &str = r#"{"result":null,"error":{"code":-31997,"message":"","data":["captcha"]}}"#;
    const UNAUTHENTICATED: &str =
        r#"{"result":null,"error":{"code":-31998,"message":"Unauthenticated","data":[]}}"#;

    struct FixedIp {
        ip: Option<IpAddr>,
        calls: AtomicUsize,
    }

    impl FixedIp {
        fn new(ip: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                ip: ip.map(|s| s.parse().unwrap()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PublicIpLookup for FixedIp {
        async fn public_ip(&self) -> Result<IpAddr> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.ip.ok_or_else(|| GatewayError::network("offline"))
        }
    }

    fn workflow(server: &Server, ip: Arc<FixedIp>) -> LoginWorkflow {
        let form = DeviceForm {
            name: "Living room".into(),
            management_port: "".into(),
            ..Default::default()
        };
        LoginWorkflow::new(client_for(server), ip, form)
    }

    async fn mock_probe(server: &mut Server, body: &str) -> Mock {
        server
            .mock("POST", "/cgi/service.cgi")
            .match_body(Matcher::Json(json!({"method": "session/login"})))
            .with_body(body)
            .create_async()
            .await
    }

    async fn mock_login(server: &mut Server, params: serde_json::Value, body: &str) -> Mock {
        server
            .mock("POST", "/cgi/service.cgi")
            .match_body(Matcher::Json(json!({"method": "session/login", "params": params})))
            .with_body(body)
            .expect(1)
            .create_async()
            .await
    }

    async fn mock_ddns(server: &mut Server, body: &str) -> Mock {
        server
            .mock("POST", "/cgi/service.cgi")
            .match_body(rpc("ddns/config"))
            .with_body(body)
            .create_async()
            .await
    }

    fn creds() -> Credentials {
        Credentials::new("admin", "x")
    }

    #[tokio::test]
    async fn no_captcha_logs_in_directly() {
        let mut server = Server::new_async().await;
        let _mock = mock_probe(&mut server, r#"{"result":null,"error":null}"#).await;
        let login = mock_login(
            &mut server,
            json!({"id": "admin", "pw": "x", "captcha": null}),
            r#"{"result":"done"}"#,
        )
        .await;

        let mut wf = workflow(&server, FixedIp::new(None));
        let state = wf.start(creds()).await.unwrap();
        assert!(matches!(state, WorkflowState::LoggedIn(_)));
        assert_eq!(
            wf.history(),
            [
                StateKind::Idle,
                StateKind::Probing,
                StateKind::LoggingIn,
                StateKind::LoggedIn
            ]
        );
        login.assert_async().await;
    }

    #[tokio::test]
    async fn captcha_waits_for_answer_before_logging_in() {
        let mut server = Server::new_async().await;
        let _mock = mock_probe(&mut server, CAPTCHA_ERROR).await;
        let _mock = server
            .mock("POST", "/cgi/service.cgi")
            .match_body(rpc("captcha/new"))
            .with_body(r#"{"result":"/captcha.jpg"}"#)
            .create_async()
            .await;
        let login = mock_login(
            &mut server,
            json!({"id": "admin", "pw": "x", "captcha": {"text": "4fz9", "url": "/captcha.jpg"}}),
            r#"{"result":"done"}"#,
        )
        .await;

        let mut wf = workflow(&server, FixedIp::new(None));
        match wf.start(creds()).await.unwrap() {
            WorkflowState::CaptchaPending(challenge) => {
                assert_eq!(challenge.image_relative_url(), "/captcha.jpg")
            }
            other => panic!("unexpected state {:?}", other),
        }
        assert!(!wf.history().contains(&StateKind::LoggingIn));

        let state = wf.submit("4fz9").await.unwrap();
        assert!(matches!(state, WorkflowState::LoggedIn(_)));
        login.assert_async().await;
    }

    #[tokio::test]
    async fn corrected_credentials_replace_start_credentials() {
        let mut server = Server::new_async().await;
        let _mock = mock_probe(&mut server, CAPTCHA_ERROR).await;
        let _mock = server
            .mock("POST", "/cgi/service.cgi")
            .match_body(rpc("captcha/new"))
            .with_body(r#"{"result":"/c/2.jpg"}"#)
            .create_async()
            .await;
        let login = mock_login(
            &mut server,
            json!({"id": "root", "pw": "y", "captcha": {"text": "ab", "url": "/c/2.jpg"}}),
            r#"{"result":"done"}"#,
        )
        .await;

        let mut wf = workflow(&server, FixedIp::new(None));
        wf.start(creds()).await.unwrap();
        wf.submit_with(Credentials::new("root", "y"), "ab").await.unwrap();
        login.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_login_is_terminal() {
        let mut server = Server::new_async().await;
        let _mock = mock_probe(&mut server, r#"{"result":null,"error":null}"#).await;
        let _mock = mock_login(
            &mut server,
            json!({"id": "admin", "pw": "x", "captcha": null}),
            r#"{"result":"fail"}"#,
        )
        .await;

        let mut wf = workflow(&server, FixedIp::new(None));
        let state = wf.start(creds()).await.unwrap();
        match state {
            WorkflowState::Error(err) => {
                assert_eq!(*err, GatewayError::LoginRejected);
                assert_eq!(err.to_string(), "invalid credentials");
            }
            other => panic!("unexpected state {:?}", other),
        }
        assert!(matches!(
            wf.fetch_ddns().await,
            Err(WorkflowError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn unauthenticated_at_ddns_step_invalidates_session_once() {
        let mut server = Server::new_async().await;
        let _mock = mock_probe(&mut server, r#"{"result":null,"error":null}"#).await;
        let _mock = mock_login(
            &mut server,
            json!({"id": "admin", "pw": "x", "captcha": null}),
            r#"{"result":"done"}"#,
        )
        .await;
        let _mock = mock_ddns(&mut server, UNAUTHENTICATED).await;

        let mut wf = workflow(&server, FixedIp::new(Some("203.0.113.5")));
        wf.start(creds()).await.unwrap();

        assert_eq!(wf.fetch_ddns().await.unwrap_err(), WorkflowError::SessionInvalidated);
        match wf.state() {
            WorkflowState::Error(err) => assert_eq!(err.to_string(), "authentication failed"),
            other => panic!("unexpected state {:?}", other),
        }
        // Terminal: the signal is not raised a second time
        assert!(matches!(
            wf.fetch_ddns().await,
            Err(WorkflowError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn unauthenticated_probe_is_never_a_login_rejection() {
        let mut server = Server::new_async().await;
        let _mock = mock_probe(&mut server, UNAUTHENTICATED).await;

        let mut wf = workflow(&server, FixedIp::new(None));
        assert_eq!(wf.start(creds()).await.unwrap_err(), WorkflowError::SessionInvalidated);
        assert!(matches!(wf.state(), WorkflowState::Error(GatewayError::Unauthenticated)));
    }

    #[tokio::test]
    async fn unauthenticated_login_is_never_a_login_rejection() {
        let mut server = Server::new_async().await;
        let _mock = mock_probe(&mut server, r#"{"result":null,"error":null}"#).await;
        let login = mock_login(
            &mut server,
            json!({"id": "admin", "pw": "x", "captcha": null}),
            UNAUTHENTICATED,
        )
        .await;

        let mut wf = workflow(&server, FixedIp::new(None));
        assert_eq!(wf.start(creds()).await.unwrap_err(), WorkflowError::SessionInvalidated);
        assert!(matches!(wf.state(), WorkflowState::Error(GatewayError::Unauthenticated)));
        assert_eq!(wf.history().last(), Some(&StateKind::Error));
        login.assert_async().await;
    }

    #[tokio::test]
    async fn unauthenticated_captcha_fetch_invalidates_session() {
        let mut server = Server::new_async().await;
        let _mock = mock_probe(&mut server, CAPTCHA_ERROR).await;
        let _mock = server
            .mock("POST", "/cgi/service.cgi")
            .match_body(rpc("captcha/new"))
            .with_body(UNAUTHENTICATED)
            .create_async()
            .await;

        let mut wf = workflow(&server, FixedIp::new(None));
        assert_eq!(wf.start(creds()).await.unwrap_err(), WorkflowError::SessionInvalidated);
        match wf.state() {
            WorkflowState::Error(err) => {
                assert_eq!(err, &GatewayError::Unauthenticated);
                assert_eq!(err.to_string(), "authentication failed");
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test]
    async fn misplaced_steps_keep_the_current_state() {
        let mut server = Server::new_async().await;
        let _mock = mock_probe(&mut server, r#"{"result":null,"error":null}"#).await;
        let _mock = mock_login(
            &mut server,
            json!({"id": "admin", "pw": "x", "captcha": null}),
            r#"{"result":"done"}"#,
        )
        .await;

        let mut wf = workflow(&server, FixedIp::new(None));
        assert_eq!(
            wf.fetch_ddns().await.unwrap_err(),
            WorkflowError::InvalidTransition {
                action: "fetch DDNS",
                state: StateKind::Idle
            }
        );
        assert!(matches!(wf.state(), WorkflowState::Idle));

        wf.start(creds()).await.unwrap();
        let history = wf.history().to_vec();
        assert_eq!(
            wf.submit_with(creds(), "abcd").await.unwrap_err(),
            WorkflowError::InvalidTransition {
                action: "submit a captcha answer",
                state: StateKind::LoggedIn
            }
        );
        match wf.state() {
            WorkflowState::LoggedIn(login) => assert_eq!(login.login_id, "admin"),
            other => panic!("unexpected state {:?}", other),
        }
        assert_eq!(wf.history(), history.as_slice());
    }

    #[tokio::test]
    async fn empty_ddns_list_is_ready_without_ddns() {
        let mut server = Server::new_async().await;
        let _mock = mock_probe(&mut server, r#"{"error":null}"#).await;
        let _mock = mock_login(
            &mut server,
            json!({"id": "admin", "pw": "x", "captcha": null}),
            r#"{"result":"done"}"#,
        )
        .await;
        let _mock = mock_ddns(&mut server, r#"{"result":[]}"#).await;

        let ip = FixedIp::new(Some("203.0.113.5"));
        let mut wf = workflow(&server, ip.clone());
        wf.start(creds()).await.unwrap();

        let WorkflowState::Ready(done) = wf.fetch_ddns().await.unwrap() else {
            panic!("expected ready");
        };
        assert!(!done.ddns_known());
        assert_eq!(done.record.name, "Living room");
        assert_eq!(done.record.management_port, 80);
        assert_eq!(done.record.external_ip_address.as_deref(), Some("203.0.113.5"));
        assert_eq!(done.record.ddns_address, None);
        assert_eq!(ip.calls.load(Ordering::SeqCst), 1);

        let manual = done.reassemble(&DeviceForm {
            name: "Living room".into(),
            ddns_address: "home.iptime.org".into(),
            remote_access_port: "8080".into(),
            ..Default::default()
        });
        assert_eq!(manual.ddns_address.as_deref(), Some("home.iptime.org"));
        assert_eq!(manual.remote_access_port, Some(8080));
    }

    #[tokio::test]
    async fn ddns_found_with_failed_ip_lookup() {
        let mut server = Server::new_async().await;
        let _mock = mock_probe(&mut server, r#"{"error":null}"#).await;
        let _mock = mock_login(
            &mut server,
            json!({"id": "admin", "pw": "x", "captcha": null}),
            r#"{"result":"done"}"#,
        )
        .await;
        let _mock = mock_ddns(
            &mut server,
            r#"{"result":[{"type":"iptime","host":"home.iptime.org","id":"1","wan_name":"wan1"},{"host":"second.iptime.org"}]}"#,
        )
        .await;

        let mut wf = workflow(&server, FixedIp::new(None));
        wf.start(creds()).await.unwrap();

        let WorkflowState::Ready(done) = wf.fetch_ddns().await.unwrap() else {
            panic!("expected ready");
        };
        assert!(done.ddns_known());
        assert_eq!(done.ddns.external_ip, crate::record::UNKNOWN);
        assert_eq!(done.record.ddns_address.as_deref(), Some("home.iptime.org"));
        assert_eq!(done.record.external_ip_address, None);
        assert_eq!(done.record.login_id, "admin");
        assert_eq!(wf.history().last(), Some(&StateKind::Ready));
    }

    #[tokio::test]
    async fn network_and_captcha_failures_are_terminal_errors() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/cgi/service.cgi")
            .with_status(500)
            .create_async()
            .await;
        let mut wf = workflow(&server, FixedIp::new(None));
        assert!(matches!(
            wf.start(creds()).await.unwrap(),
            WorkflowState::Error(GatewayError::Network(_))
        ));

        let mut server = Server::new_async().await;
        let _mock = mock_probe(&mut server, CAPTCHA_ERROR).await;
        let _mock = server
            .mock("POST", "/cgi/service.cgi")
            .match_body(rpc("captcha/new"))
            .with_body(r#"{"result":null}"#)
            .create_async()
            .await;
        let mut wf = workflow(&server, FixedIp::new(None));
        assert!(matches!(
            wf.start(creds()).await.unwrap(),
            WorkflowState::Error(GatewayError::CaptchaFetch(_))
        ));
    }

    #[tokio::test]
    async fn out_of_order_calls_leave_state_untouched() {
        let server = Server::new_async().await;
        let mut wf = workflow(&server, FixedIp::new(None));

        let err = wf.submit("abc").await.unwrap_err();
        assert_eq!(
            err,
            WorkflowError::InvalidTransition {
                action: "submit a captcha answer",
                state: StateKind::Idle
            }
        );
        assert!(matches!(wf.fetch_ddns().await, Err(WorkflowError::InvalidTransition { .. })));
        assert!(matches!(wf.state(), WorkflowState::Idle));
        assert_eq!(wf.history(), [StateKind::Idle]);
        wf.cancel();
    }

    #[tokio::test]
    async fn cancelling_a_pending_captcha_makes_no_more_calls() {
        let mut server = Server::new_async().await;
        let _mock = mock_probe(&mut server, CAPTCHA_ERROR).await;
        let _mock = server
            .mock("POST", "/cgi/service.cgi")
            .match_body(rpc("captcha/new"))
            .with_body(r#"{"result":"/captcha.jpg"}"#)
            .create_async()
            .await;
        let login = server
            .mock("POST", "/cgi/service.cgi")
            .match_body(Matcher::PartialJson(json!({"params": {"id": "admin"}})))
            .expect(0)
            .create_async()
            .await;

        let mut wf = workflow(&server, FixedIp::new(None));
        wf.start(creds()).await.unwrap();
        assert!(!wf.state().is_terminal());
        wf.cancel();
        login.assert_async().await;
    }
}
