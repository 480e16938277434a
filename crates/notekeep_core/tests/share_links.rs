mod common;

use common::{note, service};
use notekeep_core::{FileUpload, NotePatch, Recipient, ShareAccessError};

#[test]
fn shared_note_resolves_with_matching_token() {
    let (mut service, _clock) = service();
    assert!(service.create_note(note("n1", None)));

    let share = service
        .share_note(
            "n1",
            false,
            vec![Recipient::view("friend@example.com"), Recipient::view("")],
        )
        .unwrap();
    assert_eq!(share.recipients.len(), 1);
    assert_eq!(
        share.link("https://notes.example"),
        format!("https://notes.example/shared/n1?token={}", share.token)
    );

    let resolved = service.resolve_shared_note("n1", &share.token).unwrap();
    assert_eq!(resolved.id, "n1");
}

#[test]
fn resolution_reflects_pending_edits() {
    let (mut service, _clock) = service();
    assert!(service.create_note(note("n1", None)));
    let share = service.share_note("n1", true, Vec::new()).unwrap();

    assert!(service.update_note("n1", &NotePatch::content("fresh")));
    let resolved = service.resolve_shared_note("n1", &share.token).unwrap();
    assert_eq!(resolved.content, "fresh");
}

#[test]
fn resharing_rotates_the_token() {
    let (mut service, _clock) = service();
    assert!(service.create_note(note("n1", None)));
    let first = service.share_note("n1", true, Vec::new()).unwrap();
    let second = service.share_note("n1", true, Vec::new()).unwrap();

    assert_eq!(service.get_shares().len(), 1);
    assert!(matches!(
        service.resolve_shared_note("n1", &first.token),
        Err(ShareAccessError::InvalidLink)
    ));
    assert!(service.resolve_shared_note("n1", &second.token).is_ok());
}

#[test]
fn invalid_links_are_rejected() {
    let (mut service, _clock) = service();
    assert!(service.share_note("missing", true, Vec::new()).is_none());

    assert!(service.create_note(note("n1", None)));
    service.share_note("n1", true, Vec::new()).unwrap();
    assert!(matches!(
        service.resolve_shared_note("n1", ""),
        Err(ShareAccessError::MissingToken)
    ));
    assert!(matches!(
        service.resolve_shared_note("n1", "nope"),
        Err(ShareAccessError::InvalidLink)
    ));
}

#[test]
fn deleting_a_note_revokes_its_share() {
    let (mut service, _clock) = service();
    assert!(service.create_note(note("n1", None)));
    let share = service.share_note("n1", true, Vec::new()).unwrap();

    assert!(service.delete_note("n1"));

    assert!(service.get_shares().is_empty());
    assert!(matches!(
        service.resolve_shared_note("n1", &share.token),
        Err(ShareAccessError::InvalidLink)
    ));
    assert!(!service.revoke_share("n1"));
}

fn upload(name: &str) -> FileUpload {
    FileUpload {
        name: name.to_string(),
        size: 1_536,
        mime_type: "text/plain".to_string(),
        url: format!("file:///tmp/{name}"),
    }
}

#[test]
fn uploaded_file_is_private_until_shared() {
    let (mut service, _clock) = service();
    let file = service.add_shared_file(upload("a.txt")).unwrap();

    assert!(file.id.starts_with("file-"));
    assert_eq!(file.uploaded_at, "2026-03-01T12:00:00.000Z");
    assert!(!file.is_public);
    assert_eq!(file.link("https://notes.example"), None);
    assert!(matches!(
        service.resolve_shared_file(&file.id, "guess"),
        Err(ShareAccessError::InvalidToken)
    ));
    assert_eq!(service.get_shared_files(), vec![file]);
}

#[test]
fn shared_file_resolves_with_its_token() {
    let (mut service, _clock) = service();
    let file = service.add_shared_file(upload("a.txt")).unwrap();

    let shared = service
        .share_file(
            &file.id,
            false,
            vec![Recipient::view("friend@example.com"), Recipient::view("  ")],
        )
        .unwrap();
    let token = shared.share_token.clone().unwrap();
    assert_eq!(shared.shared_with.len(), 1);
    assert_eq!(
        shared.link("https://notes.example").unwrap(),
        format!("https://notes.example/shared-files/{}?token={token}", file.id)
    );

    let resolved = service.resolve_shared_file(&file.id, &token).unwrap();
    assert_eq!(resolved.name, "a.txt");
    assert!(matches!(
        service.resolve_shared_file(&file.id, ""),
        Err(ShareAccessError::MissingToken)
    ));
}

#[test]
fn public_file_opens_with_any_token() {
    let (mut service, _clock) = service();
    let file = service.add_shared_file(upload("a.txt")).unwrap();
    service.share_file(&file.id, true, Vec::new()).unwrap();

    assert!(service.resolve_shared_file(&file.id, "stale").is_ok());
}

#[test]
fn deleted_file_link_stops_resolving() {
    let (mut service, _clock) = service();
    let keep = service.add_shared_file(upload("keep.txt")).unwrap();
    let gone = service.add_shared_file(upload("gone.txt")).unwrap();
    let token = service
        .share_file(&gone.id, false, Vec::new())
        .unwrap()
        .share_token
        .unwrap();

    assert!(service.delete_shared_file(&gone.id));
    assert!(!service.delete_shared_file(&gone.id));
    assert!(service.share_file(&gone.id, true, Vec::new()).is_none());

    assert!(matches!(
        service.resolve_shared_file(&gone.id, &token),
        Err(ShareAccessError::FileNotFound(_))
    ));
    assert_eq!(service.get_shared_files(), vec![keep]);
}
