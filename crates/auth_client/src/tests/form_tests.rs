use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use axum::{
    extract::Multipart,
    http::StatusCode,
    routing::{get, post},
    Json, Router as AxumRouter,
};
use serde_json::json;
use shared::{domain::Role, session::SessionRepository};
use tokio::net::TcpListener;

use super::*;
use crate::tests::{MemorySessions, RecordingRouter};

async fn spawn_app(app: AxumRouter) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

struct Harness {
    sessions: Arc<MemorySessions>,
    router: Arc<RecordingRouter>,
    deps: FormDeps,
}

fn harness(addr: SocketAddr) -> Harness {
    let sessions = Arc::new(MemorySessions::default());
    let router = Arc::new(RecordingRouter::default());
    let deps = FormDeps {
        transport: Arc::new(Transport::new(format!("http://{addr}"))),
        sessions: Arc::clone(&sessions) as Arc<dyn SessionRepository>,
        router: Arc::clone(&router) as Arc<dyn Router>,
        login_timeout: Duration::from_secs(5),
        register_timeout: Duration::from_secs(5),
    };
    Harness {
        sessions,
        router,
        deps,
    }
}

/// Server that answers everything and counts how often it was reached.
fn counting_app(hits: Arc<AtomicUsize>) -> AxumRouter {
    AxumRouter::new().fallback(move || {
        let hits = Arc::clone(&hits);
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            Json(json!({"ok": true}))
        }
    })
}

type RecordedFields = Arc<Mutex<Vec<(String, Option<String>, String)>>>;

fn registration_app(path: &'static str, fields: RecordedFields) -> AxumRouter {
    AxumRouter::new().route(
        path,
        post(move |mut multipart: Multipart| {
            let fields = Arc::clone(&fields);
            async move {
                while let Some(field) = multipart.next_field().await.unwrap() {
                    let name = field.name().unwrap_or("").to_string();
                    let file_name = field.file_name().map(str::to_string);
                    let bytes = field.bytes().await.unwrap();
                    fields.lock().unwrap().push((
                        name,
                        file_name,
                        String::from_utf8_lossy(&bytes).into_owned(),
                    ));
                }
                Json(json!({"message": "registered"}))
            }
        }),
    )
}

fn fill_student_registration(form: &mut FormController) {
    form.update_field("studentId", "S1");
    form.update_field("username", "asha");
    form.update_field("password", "secret1");
    form.update_field("email", "asha@example.com");
    form.update_field("studName", "Asha");
    form.update_field("major", "CS");
    form.update_field("year", "2");
    form.update_field("studRollNo", "42");
}

#[test]
fn humanizes_camel_case_field_names() {
    assert_eq!(humanize_field("studRollNo"), "Stud Roll No");
    assert_eq!(humanize_field("studentId"), "Student Id");
    assert_eq!(humanize_field("major"), "Major");
}

#[tokio::test]
async fn each_missing_required_field_fails_by_name_with_no_network() {
    let hits = Arc::new(AtomicUsize::new(0));
    let addr = spawn_app(counting_app(Arc::clone(&hits))).await;

    for missing in required_fields(Role::Student) {
        let h = harness(addr);
        let mut form = FormController::registration(Role::Student, h.deps);
        fill_student_registration(&mut form);
        form.update_field(missing, "");

        form.submit().await;

        assert_eq!(form.phase(), FormPhase::Error);
        assert_eq!(
            form.error(),
            Some(format!("{} is required", humanize_field(missing)).as_str()),
            "field {missing}"
        );
    }
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_email_is_rejected_before_submission() {
    let hits = Arc::new(AtomicUsize::new(0));
    let addr = spawn_app(counting_app(Arc::clone(&hits))).await;

    for bad in ["plainaddress", "missing@tld", "no-at.example.com", "a b@c.d"] {
        let h = harness(addr);
        let mut form = FormController::registration(Role::Student, h.deps);
        fill_student_registration(&mut form);
        form.update_field("email", bad);

        form.submit().await;

        assert_eq!(form.error(), Some("Please enter a valid email address"), "{bad}");
    }
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn password_boundary_is_six_characters() {
    let fields: RecordedFields = Arc::default();
    let addr = spawn_app(registration_app(
        "/api/students/add-student",
        Arc::clone(&fields),
    ))
    .await;

    let h = harness(addr);
    let mut form = FormController::registration(Role::Student, h.deps);
    fill_student_registration(&mut form);

    form.update_field("password", "12345");
    form.submit().await;
    assert_eq!(
        form.error(),
        Some("Password must be at least 6 characters long")
    );

    form.update_field("password", "123456");
    form.submit().await;
    assert_eq!(form.phase(), FormPhase::Success);
}

#[tokio::test]
async fn sign_in_requires_username_before_anything_else() {
    let hits = Arc::new(AtomicUsize::new(0));
    let addr = spawn_app(counting_app(Arc::clone(&hits))).await;

    let h = harness(addr);
    let mut form = FormController::sign_in(Role::Student, h.deps);
    form.update_field("password", "whatever");

    form.submit().await;

    assert_eq!(form.error(), Some("Username is required"));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn wrong_credentials_surface_the_auth_message() {
    let app = AxumRouter::new()
        .fallback(|| async { (StatusCode::UNAUTHORIZED, "Unauthorized") });
    let addr = spawn_app(app).await;

    let h = harness(addr);
    let mut form = FormController::sign_in(Role::Professor, h.deps);
    form.update_field("username", "prof");
    form.update_field("password", "wrongpw");

    form.submit().await;

    assert_eq!(form.phase(), FormPhase::Error);
    assert_eq!(form.error(), Some("Invalid username or password"));
    // Entered values survive a failed attempt.
    assert_eq!(form.value("username"), "prof");
    assert!(h.router.destinations().is_empty());
}

#[tokio::test]
async fn successful_sign_in_persists_session_and_navigates() {
    let app = AxumRouter::new()
        .route(
            "/api/students/login",
            post(|| async { Json(json!({"studentId": "S1"})) }),
        )
        .route(
            "/api/students/S1",
            get(|| async {
                Json(json!({"studentId": "S1", "studName": "Asha", "email": "asha@example.com"}))
            }),
        );
    let addr = spawn_app(app).await;

    let h = harness(addr);
    let mut form = FormController::sign_in(Role::Student, h.deps);
    form.update_field("username", "  asha  ");
    form.update_field("password", "secret1");
    form.set_remember(true);

    form.submit().await;

    assert_eq!(form.phase(), FormPhase::Success);
    assert_eq!(h.sessions.entry("userRole").as_deref(), Some("student"));
    assert_eq!(h.sessions.entry("studentId").as_deref(), Some("S1"));
    assert!(h.sessions.entry("studentData").is_some());
    assert!(h.sessions.remembered(Role::Student).await.unwrap());
    assert_eq!(
        h.router.destinations(),
        vec!["/dashboard/student/home".to_string()]
    );
}

#[tokio::test]
async fn sign_in_accepts_a_bare_identifier_body() {
    let app = AxumRouter::new().route("/api/hods/login", post(|| async { "H7" }));
    let addr = spawn_app(app).await;

    let h = harness(addr);
    let mut form = FormController::sign_in(Role::Hod, h.deps);
    form.update_field("username", "head");
    form.update_field("password", "secret1");

    form.submit().await;

    assert_eq!(form.phase(), FormPhase::Success);
    assert_eq!(h.sessions.entry("hodId").as_deref(), Some("H7"));
}

#[tokio::test]
async fn sign_in_falls_back_when_primary_route_is_gone() {
    let app = AxumRouter::new().route(
        "/api/student/login",
        post(|| async { Json(json!({"id": "S3"})) }),
    );
    let addr = spawn_app(app).await;

    let h = harness(addr);
    let mut form = FormController::sign_in(Role::Student, h.deps);
    form.update_field("username", "asha");
    form.update_field("password", "secret1");

    form.submit().await;

    assert_eq!(form.phase(), FormPhase::Success);
    assert_eq!(h.sessions.entry("studentId").as_deref(), Some("S3"));
}

#[tokio::test]
async fn profile_fetch_failure_does_not_fail_the_login() {
    // Login works, profile route missing entirely.
    let app = AxumRouter::new().route(
        "/api/professors/login",
        post(|| async { Json(json!({"professorId": "P2"})) }),
    );
    let addr = spawn_app(app).await;

    let h = harness(addr);
    let mut form = FormController::sign_in(Role::Professor, h.deps);
    form.update_field("username", "prof");
    form.update_field("password", "secret1");

    form.submit().await;

    assert_eq!(form.phase(), FormPhase::Success);
    assert_eq!(h.sessions.entry("professorId").as_deref(), Some("P2"));
    assert!(h.sessions.entry("professorData").is_none());
}

#[tokio::test]
async fn registration_sends_every_field_and_a_placeholder_file_part() {
    let fields: RecordedFields = Arc::default();
    let addr = spawn_app(registration_app(
        "/api/students/add-student",
        Arc::clone(&fields),
    ))
    .await;

    let h = harness(addr);
    let mut form = FormController::registration(Role::Student, h.deps);
    fill_student_registration(&mut form);

    form.submit().await;
    assert_eq!(form.phase(), FormPhase::Success);

    let recorded = fields.lock().unwrap().clone();
    let names: Vec<&str> = recorded.iter().map(|(n, _, _)| n.as_str()).collect();
    let mut expected: Vec<&str> = declared_fields(Role::Student).to_vec();
    expected.push("file");
    assert_eq!(names, expected);

    let (_, file_name, body) = recorded.last().unwrap();
    assert_eq!(file_name.as_deref(), Some("empty.png"));
    assert!(body.is_empty());
}

#[tokio::test]
async fn attached_image_replaces_the_placeholder() {
    let fields: RecordedFields = Arc::default();
    let addr = spawn_app(registration_app(
        "/api/students/add-student",
        Arc::clone(&fields),
    ))
    .await;

    let h = harness(addr);
    let mut form = FormController::registration(Role::Student, h.deps);
    fill_student_registration(&mut form);
    form.attach_image("me.jpg", b"jpegbytes".to_vec());

    form.submit().await;

    let recorded = fields.lock().unwrap().clone();
    let (name, file_name, body) = recorded.last().unwrap();
    assert_eq!(name, "file");
    assert_eq!(file_name.as_deref(), Some("me.jpg"));
    assert_eq!(body, "jpegbytes");
}

#[tokio::test]
async fn professor_subjects_list_is_normalized() {
    let fields: RecordedFields = Arc::default();
    let addr = spawn_app(registration_app(
        "/api/professors/add-prof",
        Arc::clone(&fields),
    ))
    .await;

    let h = harness(addr);
    let mut form = FormController::registration(Role::Professor, h.deps);
    form.update_field("professorId", "P1");
    form.update_field("name", "Rao");
    form.update_field("departmentName", "CSE");
    form.update_field("subject", "Algorithms");
    form.update_field("username", "rao");
    form.update_field("password", "secret1");
    form.update_field("email", "rao@example.com");
    form.update_field("phone", "555-0100");
    form.update_field("subjects", " math ,  physics ,cs");

    form.submit().await;
    assert_eq!(form.phase(), FormPhase::Success);

    let recorded = fields.lock().unwrap().clone();
    let subjects = recorded
        .iter()
        .find(|(n, _, _)| n == "subjects")
        .map(|(_, _, v)| v.clone())
        .unwrap();
    assert_eq!(subjects, "math,physics,cs");
}

#[tokio::test]
async fn registration_success_clears_the_form_and_redirects_later() {
    let fields: RecordedFields = Arc::default();
    let addr = spawn_app(registration_app(
        "/api/hods/add-hod",
        Arc::clone(&fields),
    ))
    .await;

    let h = harness(addr);
    let mut form = FormController::registration(Role::Hod, h.deps);
    form.update_field("name", "Meera");
    form.update_field("department", "ECE");
    form.update_field("username", "meera");
    form.update_field("password", "secret1");
    form.update_field("email", "meera@example.com");
    form.update_field("phone", "555-0101");

    form.submit().await;

    assert_eq!(form.phase(), FormPhase::Success);
    assert_eq!(
        form.notice(),
        Some("HOD registered successfully! Redirecting to login...")
    );
    assert_eq!(form.value("name"), "");
    assert_eq!(form.value("email"), "");
    assert!(h.router.destinations().is_empty());

    // Let the spawned redirect task register its timer before freezing time.
    tokio::task::yield_now().await;
    tokio::time::pause();
    tokio::time::advance(Duration::from_millis(2100)).await;
    tokio::time::resume();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(
        h.router.destinations(),
        vec!["/auth/hod/sign-in".to_string()]
    );
}

#[tokio::test]
async fn failed_registration_keeps_the_form_filled() {
    let app = AxumRouter::new().fallback(|| async {
        (StatusCode::CONFLICT, "duplicate key")
    });
    let addr = spawn_app(app).await;

    let h = harness(addr);
    let mut form = FormController::registration(Role::Student, h.deps);
    fill_student_registration(&mut form);

    form.submit().await;

    assert_eq!(form.phase(), FormPhase::Error);
    assert_eq!(
        form.error(),
        Some("Student with same username or email already exists")
    );
    assert_eq!(form.value("username"), "asha");
    assert!(h.router.destinations().is_empty());
}
