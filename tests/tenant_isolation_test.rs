mod common;

use common::{create_request, resume, world};
use prequal_backend::error::Error;
use prequal_backend::models::session::SessionStatus;
use prequal_backend::services::session_manager::ApplicationContact;
use prequal_backend::services::tenant_guard::AccessContext;
use tokio_test::assert_err;
use uuid::Uuid;

fn is_mismatch(err: &Error) -> bool {
    matches!(err, Error::TenantMismatch)
}

#[tokio::test]
async fn foreign_workspace_cannot_touch_a_session() {
    let w = world();
    let ctx = AccessContext::anonymous();
    let session = w
        .service
        .create_session(create_request("acme", w.acme_vacancy, true))
        .await
        .unwrap();
    let id = session.id;

    let get = w.service.get_session(id, "globex", &ctx).await.unwrap_err();
    assert!(is_mismatch(&get));
    let upload = w
        .service
        .upload_resume(id, "globex", resume(), &ctx)
        .await
        .unwrap_err();
    assert!(is_mismatch(&upload));
    let message = w
        .service
        .send_message(id, "globex", "hello", &ctx)
        .await
        .unwrap_err();
    assert!(is_mismatch(&message));
    let list = w.service.list_messages(id, "globex", &ctx).await.unwrap_err();
    assert!(is_mismatch(&list));
    let evaluate = w
        .service
        .evaluate_session(id, "globex", &ctx)
        .await
        .unwrap_err();
    assert!(is_mismatch(&evaluate));
    let result = w
        .service
        .get_candidate_result(id, "globex", &ctx)
        .await
        .unwrap_err();
    assert!(is_mismatch(&result));
    let contact = ApplicationContact {
        candidate_name: "Mallory".into(),
        candidate_email: None,
        candidate_phone: None,
        cover_letter: None,
    };
    let submit = w
        .service
        .submit_application(id, "globex", contact, &ctx)
        .await
        .unwrap_err();
    assert!(is_mismatch(&submit));

    // Nothing leaked through: the owner still sees the untouched session.
    let own = w.service.get_session(id, "acme", &ctx).await.unwrap();
    assert_eq!(own.status, SessionStatus::ResumePending);
    assert!(own.parsed_resume.is_none());
    assert!(own.conversation_id.is_none());
    assert_eq!(w.completion.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn foreign_recruiter_cannot_read_reports() {
    let w = world();
    let session = w
        .service
        .create_session(create_request("acme", w.acme_vacancy, true))
        .await
        .unwrap();

    // A globex member asking through globex hits the ownership check.
    let err = w
        .service
        .get_recruiter_report(session.id, "globex", &AccessContext::caller("recruiter-2"))
        .await
        .unwrap_err();
    assert!(is_mismatch(&err));

    // The same member asking through acme is not a member there.
    let err = w
        .service
        .get_recruiter_report(session.id, "acme", &AccessContext::caller("recruiter-2"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AccessDenied));

    let report = w
        .service
        .get_recruiter_report(session.id, "acme", &AccessContext::caller("recruiter-1"))
        .await
        .unwrap();
    assert_eq!(report.vacancy_title, "Backend Engineer");
}

#[tokio::test]
async fn vacancies_of_other_tenants_are_invisible() {
    let w = world();
    let err = w
        .service
        .create_session(create_request("acme", w.globex_vacancy, true))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VACANCY_NOT_FOUND");
    assert_eq!(w.store.session_count().unwrap(), 0);
}

#[tokio::test]
async fn mismatches_and_misses_are_audited_distinctly() {
    let w = world();
    let ctx = AccessContext::anonymous();
    let session = w
        .service
        .create_session(create_request("acme", w.acme_vacancy, true))
        .await
        .unwrap();

    assert_err!(w.service.get_session(session.id, "globex", &ctx).await);
    let missing = Uuid::new_v4();
    let err = w.service.get_session(missing, "globex", &ctx).await.unwrap_err();
    assert_eq!(err.code(), "SESSION_NOT_FOUND");

    let failures: Vec<_> = w
        .store
        .audit_logs()
        .unwrap()
        .into_iter()
        .filter(|log| !log.success)
        .collect();
    let reasons: Vec<_> = failures
        .iter()
        .filter_map(|log| log.failure_reason.as_deref())
        .collect();
    assert_eq!(reasons, vec!["TENANT_MISMATCH", "SESSION_NOT_FOUND"]);
    assert_eq!(failures[0].resource_id.as_deref(), Some(session.id.to_string().as_str()));
}

#[tokio::test]
async fn unknown_and_malformed_workspaces_are_rejected_before_lookup() {
    let w = world();
    let ctx = AccessContext::anonymous();
    let id = Uuid::new_v4();

    let err = w.service.get_session(id, "initech", &ctx).await.unwrap_err();
    assert_eq!(err.code(), "WORKSPACE_NOT_FOUND");
    let err = w.service.get_session(id, "../acme", &ctx).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_WORKSPACE_ID");
}
