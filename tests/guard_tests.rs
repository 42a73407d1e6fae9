use async_trait::async_trait;
use axum::{
    Extension, Json, Router,
    body::Body,
    http::{Request, StatusCode, request::Parts},
    routing::get,
};
use catalog_routes::{
    AccessGuard, AuthError, Authenticator, GuardError, RouteTable, guard::RoleExtractor,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tower::ServiceExt;

// --- Scripted Authentication Strategy ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Caller {
    name: String,
    roles: Vec<String>,
}

fn caller(name: &str, roles: &[&str]) -> Caller {
    Caller {
        name: name.to_string(),
        roles: roles.iter().map(|r| r.to_string()).collect(),
    }
}

enum Outcome {
    Principal(Caller),
    NoPrincipal,
    Failure,
    Stall,
}

struct ScriptedAuthenticator {
    outcome: Outcome,
    calls: AtomicUsize,
}

impl ScriptedAuthenticator {
    fn new(outcome: Outcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Authenticator<Caller> for ScriptedAuthenticator {
    async fn authenticate(&self, _parts: &Parts) -> Result<Option<Caller>, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Outcome::Principal(caller) => Ok(Some(caller.clone())),
            Outcome::NoPrincipal => Ok(None),
            Outcome::Failure => Err(AuthError::Strategy("verifier offline".to_string())),
            Outcome::Stall => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(None)
            }
        }
    }
}

fn counting_extractor(counter: Arc<AtomicUsize>) -> RoleExtractor<Caller> {
    Arc::new(move |caller: &Caller| {
        counter.fetch_add(1, Ordering::SeqCst);
        caller.roles.clone()
    })
}

struct Harness {
    guard: AccessGuard<Caller>,
    authenticator: Arc<ScriptedAuthenticator>,
    extractions: Arc<AtomicUsize>,
}

fn harness(outcome: Outcome) -> Harness {
    let authenticator = ScriptedAuthenticator::new(outcome);
    let extractions = Arc::new(AtomicUsize::new(0));
    let guard = AccessGuard::new(authenticator.clone(), counting_extractor(extractions.clone()));

    Harness {
        guard,
        authenticator,
        extractions,
    }
}

/// Router with a single guarded GET /protected that echoes the attached principal.
fn guarded_app(guard: &AccessGuard<Caller>, roles: &[&str], hits: Arc<AtomicUsize>) -> Router {
    let mut table: RouteTable = RouteTable::new();
    table.guarded(
        "/protected",
        guard.guard(roles.iter().copied()),
        get(move |Extension(caller): Extension<Caller>| async move {
            hits.fetch_add(1, Ordering::SeqCst);
            Json(caller)
        }),
    );
    table.into_router()
}

async fn call(app: Router) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .uri("/protected")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn empty_parts() -> Parts {
    let (parts, _) = Request::builder().body(()).unwrap().into_parts();
    parts
}

// --- Request Scenarios ---

#[tokio::test]
async fn test_unauthenticated_request_gets_401() {
    let h = harness(Outcome::NoPrincipal);
    let hits = Arc::new(AtomicUsize::new(0));

    let (status, body) = call(guarded_app(&h.guard, &["admin"], hits.clone())).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "status": "error", "code": "unauthorized" }));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(h.extractions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_role_outside_permitted_set_gets_403() {
    let h = harness(Outcome::Principal(caller("erin", &["editor"])));
    let hits = Arc::new(AtomicUsize::new(0));

    let (status, body) = call(guarded_app(&h.guard, &["admin"], hits.clone())).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "status": "error", "code": "forbidden" }));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_permitted_role_reaches_handler_with_principal() {
    let admin = caller("ada", &["admin"]);
    let h = harness(Outcome::Principal(admin.clone()));
    let hits = Arc::new(AtomicUsize::new(0));

    let (status, body) = call(guarded_app(&h.guard, &["admin", "editor"], hits.clone())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(serde_json::from_value::<Caller>(body).unwrap(), admin);
    assert_eq!(h.authenticator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_strategy_failure_is_an_internal_error() {
    let h = harness(Outcome::Failure);
    let hits = Arc::new(AtomicUsize::new(0));

    let (status, body) = call(guarded_app(&h.guard, &["admin"], hits.clone())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "status": "error", "code": "internal_error" }));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(h.extractions.load(Ordering::SeqCst), 0);
}

// --- Gate Properties ---

#[tokio::test]
async fn test_outcome_does_not_depend_on_requested_roles() {
    let role_sets: [&[&str]; 3] = [&["admin"], &["viewer", "editor"], &[]];

    for roles in role_sets {
        let h = harness(Outcome::NoPrincipal);
        let err = h.guard.guard(roles.iter().copied()).check(&mut empty_parts()).await;
        assert!(matches!(err, Err(GuardError::Unauthorized)));

        let h = harness(Outcome::Failure);
        let err = h.guard.guard(roles.iter().copied()).check(&mut empty_parts()).await;
        assert!(matches!(err, Err(GuardError::Authentication(AuthError::Strategy(_)))));
        assert_eq!(h.extractions.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn test_membership_check() {
    let h = harness(Outcome::Principal(caller("ada", &["admin"])));
    let mut parts = empty_parts();

    let principal = h
        .guard
        .guard(["admin", "editor"])
        .check(&mut parts)
        .await
        .unwrap();
    assert_eq!(principal.name, "ada");
    assert_eq!(parts.extensions.get::<Caller>(), Some(&principal));

    let h = harness(Outcome::Principal(caller("vic", &["viewer"])));
    let result = h.guard.guard(["admin"]).check(&mut empty_parts()).await;
    assert!(matches!(result, Err(GuardError::Forbidden)));
    assert_eq!(h.extractions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_gates_from_one_guard_are_independent() {
    let h = harness(Outcome::Principal(caller("vic", &["viewer"])));

    let admin_only = h.guard.guard(["admin"]);
    let readers = h.guard.guard(["viewer", "editor"]);

    assert!(matches!(
        admin_only.check(&mut empty_parts()).await,
        Err(GuardError::Forbidden)
    ));
    assert!(readers.check(&mut empty_parts()).await.is_ok());
    assert!(matches!(
        admin_only.check(&mut empty_parts()).await,
        Err(GuardError::Forbidden)
    ));

    let mut permitted: Vec<&str> = readers.permitted().collect();
    permitted.sort();
    assert_eq!(permitted, ["editor", "viewer"]);
}

#[tokio::test]
async fn test_stalled_strategy_times_out() {
    let h = harness(Outcome::Stall);
    let guard = h.guard.with_timeout(Some(Duration::from_millis(20)));
    let hits = Arc::new(AtomicUsize::new(0));

    let result = guard.guard(["admin"]).check(&mut empty_parts()).await;
    assert!(matches!(
        result,
        Err(GuardError::Authentication(AuthError::TimedOut(_)))
    ));

    let (status, _) = call(guarded_app(&guard, &["admin"], hits.clone())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[test]
fn test_guard_error_status_codes() {
    assert_eq!(GuardError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(GuardError::Forbidden.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        GuardError::from(AuthError::TimedOut(Duration::from_secs(1))).status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}
