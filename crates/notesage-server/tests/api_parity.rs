//! API parity tests: the JSON the store produces must keep the field names
//! the web client reads (`_id`, camelCase, RFC 3339 timestamps).

use notesage_store::{NewAttachment, NewNote, SqliteStore, UserProfile};

fn store_with_note() -> (tempfile::TempDir, SqliteStore, String, String) {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(dir.path()).unwrap();
    let user = store
        .upsert_user(&UserProfile {
            google_id: "g".into(),
            email: "a@b.c".into(),
            name: "A".into(),
            picture: Some("https://example.com/a.png".into()),
        })
        .unwrap();
    let note = store
        .create_note(
            &user.id,
            NewNote {
                title: Some("Syllabus".into()),
                tags: Some(vec!["school".into()]),
                ..Default::default()
            },
        )
        .unwrap();
    (dir, store, user.id, note.id)
}

/// Note: { _id, title, content, folder, tags, user, attachments, createdAt, updatedAt }
#[test]
fn test_note_shape() {
    let (_dir, store, user_id, note_id) = store_with_note();
    let note = store.get_note(&user_id, &note_id).unwrap().unwrap();
    let json = serde_json::to_value(&note).unwrap();

    assert!(json["_id"].is_string());
    assert_eq!(json["title"], "Syllabus");
    assert!(json["content"].is_string());
    assert_eq!(json["folder"], "General");
    assert!(json["tags"].is_array());
    assert_eq!(json["user"], user_id.as_str());
    assert!(json["attachments"].is_array());
    assert!(json.get("summary").is_none());

    let created = json["createdAt"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(created).is_ok());
    assert!(json["updatedAt"].is_string());
    assert!(json.get("created_at").is_none());
}

/// Attachment: { _id, name, url, path, size, mimeType, extractedText, createdAt }
#[test]
fn test_attachment_shape() {
    let (_dir, store, user_id, note_id) = store_with_note();
    let note = store
        .add_attachment(
            &user_id,
            &note_id,
            NewAttachment {
                name: "scan.png".into(),
                url: "/uploads/attachments/n-1.png".into(),
                path: "uploads/attachments/n-1.png".into(),
                size: 2048,
                mime_type: "image/png".into(),
                extracted_text: None,
            },
        )
        .unwrap()
        .unwrap();
    let json = serde_json::to_value(&note.attachments[0]).unwrap();

    assert!(json["_id"].is_string());
    assert_eq!(json["name"], "scan.png");
    assert_eq!(json["url"], "/uploads/attachments/n-1.png");
    assert_eq!(json["path"], "uploads/attachments/n-1.png");
    assert_eq!(json["size"], 2048);
    assert_eq!(json["mimeType"], "image/png");
    assert!(json["extractedText"].is_null());
    assert!(json["createdAt"].is_string());
}

/// User payload returned at sign-in: { name, email, picture }
#[test]
fn test_user_shape() {
    let (_dir, store, user_id, _) = store_with_note();
    let user = store.get_user(&user_id).unwrap().unwrap();
    let json = serde_json::to_value(&user).unwrap();

    assert_eq!(json["_id"], user_id.as_str());
    assert_eq!(json["googleId"], "g");
    assert_eq!(json["picture"], "https://example.com/a.png");
    assert!(json["folders"].is_array());
}
