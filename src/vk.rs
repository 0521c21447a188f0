//! VK API client for publishing photos on a group wall.
//!
//! Posting a photo takes four calls: ask for an upload server, upload the
//! file there, save the uploaded photo to the wall album, and finally create
//! the wall post referencing the saved photo.

use std::fmt;
use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::VkConfig;
use crate::http;
use crate::{Error, Result};

/// Raw fields returned by the upload server, passed on to `photos.saveWallPhoto`.
pub type UploadedPhoto = Map<String, Value>;

/// Reference to a saved photo, rendered as `photo{owner_id}_{media_id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentId {
    pub owner_id: i64,
    pub media_id: i64,
}

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "photo{}_{}", self.owner_id, self.media_id)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    response: T,
}

#[derive(Debug, Deserialize)]
struct UploadServer {
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct SavedPhoto {
    id: i64,
    owner_id: i64,
}

/// Truthiness of a JSON value, the way VK clients usually test `error`.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

/// Fail if a decoded VK response carries an `error` payload.
///
/// An absent or falsy `error` counts as success. A truthy `error` without
/// `error_code`/`error_msg` is reported as a malformed response.
pub fn check_error_in_response(response: &Value) -> Result<()> {
    let Some(error) = response.get("error") else {
        return Ok(());
    };
    if !is_truthy(error) {
        return Ok(());
    }

    let code = error.get("error_code").and_then(Value::as_i64);
    let message = error.get("error_msg").and_then(Value::as_str);

    match (code, message) {
        (Some(code), Some(message)) => Err(Error::Api {
            code,
            message: message.to_string(),
        }),
        _ => Err(Error::MalformedResponse(format!(
            "error payload without error_code/error_msg: {}",
            error
        ))),
    }
}

/// Decode a VK response body and check it for an error payload.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let value: Value = http::read_json(response).await?;
    check_error_in_response(&value)?;
    Ok(serde_json::from_value(value)?)
}

// Non-string scalars go out as JSON text, so booleans are lowercase
// `true`/`false`, not capitalized. VK upload servers only return strings
// and numbers today.
fn query_value(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct VkClient {
    http: Client,
    config: VkConfig,
}

impl VkClient {
    pub fn new(config: VkConfig) -> Result<Self> {
        Ok(Self {
            http: http::client()?,
            config,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), method)
    }

    fn credentials(&self) -> [(&'static str, String); 3] {
        [
            ("access_token", self.config.access_token.clone()),
            ("v", self.config.api_version.clone()),
            ("group_id", self.config.group_id.clone()),
        ]
    }

    /// Ask VK for a one-off upload endpoint for the group wall.
    pub async fn get_upload_url(&self) -> Result<String> {
        let url = self.method_url("photos.getWallUploadServer");
        debug!(method = "photos.getWallUploadServer", "Calling VK API");

        let response = self.http.get(&url).query(&self.credentials()).send().await?;
        let envelope: Envelope<UploadServer> = decode(response).await?;

        Ok(envelope.response.upload_url)
    }

    /// Upload the file at `photo_path` as multipart field `photo`.
    pub async fn upload_photo(&self, photo_path: &Path, upload_url: &str) -> Result<UploadedPhoto> {
        let file_bytes = tokio::fs::read(photo_path).await?;
        let file_name = photo_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("photo")
            .to_string();

        let form = Form::new().part("photo", Part::bytes(file_bytes).file_name(file_name));

        debug!(path = %photo_path.display(), "Uploading photo");
        let response = self.http.post(upload_url).multipart(form).send().await?;

        decode(response).await
    }

    /// Save an uploaded photo to the wall album and return its attachment id.
    pub async fn save_wall_photo(&self, upload_response: UploadedPhoto) -> Result<AttachmentId> {
        let mut fields = upload_response;
        for (key, value) in self.credentials() {
            fields.insert(key.to_string(), Value::String(value));
        }

        let params: Vec<(String, String)> = fields
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| (key, query_value(value)))
            .collect();

        let url = self.method_url("photos.saveWallPhoto");
        debug!(method = "photos.saveWallPhoto", "Calling VK API");

        let response = self.http.post(&url).query(&params).send().await?;
        let envelope: Envelope<Vec<SavedPhoto>> = decode(response).await?;

        let saved = envelope.response.into_iter().next().ok_or_else(|| {
            Error::MalformedResponse("photos.saveWallPhoto returned no photos".to_string())
        })?;

        let attachment = AttachmentId {
            owner_id: saved.owner_id,
            media_id: saved.id,
        };
        info!(%attachment, "Photo saved to wall album");
        Ok(attachment)
    }

    /// Publish a wall post on behalf of the group.
    pub async fn post_photo(&self, attachment: &AttachmentId, message: &str) -> Result<Value> {
        let owner_id = format!("-{}", self.config.group_id);
        let attachments = attachment.to_string();

        let url = self.method_url("wall.post");
        debug!(method = "wall.post", %attachments, "Calling VK API");

        let response = self
            .http
            .get(&url)
            .query(&[
                ("access_token", self.config.access_token.as_str()),
                ("v", self.config.api_version.as_str()),
                ("from_group", "1"),
                ("owner_id", owner_id.as_str()),
                ("attachments", attachments.as_str()),
                ("message", message),
            ])
            .send()
            .await?;

        decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn client(server: &MockServer) -> VkClient {
        let config = VkConfig::new("token", "5.131", "123").with_api_url(server.url("/method"));
        VkClient::new(config).unwrap()
    }

    fn error_payload() -> Value {
        json!({ "error": { "error_code": 100, "error_msg": "bad" } })
    }

    #[test]
    fn attachment_id_display() {
        let attachment = AttachmentId {
            owner_id: 111,
            media_id: 222,
        };
        assert_eq!(attachment.to_string(), "photo111_222");

        let group_owned = AttachmentId {
            owner_id: -123,
            media_id: 9,
        };
        assert_eq!(group_owned.to_string(), "photo-123_9");
    }

    #[test]
    fn query_value_renders_scalars_as_json_text() {
        assert_eq!(query_value(json!("abc")), "abc");
        assert_eq!(query_value(json!(7)), "7");
        assert_eq!(query_value(json!(true)), "true");
        assert_eq!(query_value(json!(false)), "false");
    }

    #[test]
    fn check_error_reports_code_and_message() {
        let err = check_error_in_response(&error_payload()).unwrap_err();
        assert!(matches!(err, Error::Api { code: 100, .. }));
        assert_eq!(err.to_string(), "Error 100 - bad");
    }

    #[test]
    fn check_error_accepts_response_without_error() {
        assert!(check_error_in_response(&json!({ "response": { "upload_url": "x" } })).is_ok());
        assert!(check_error_in_response(&json!([1, 2, 3])).is_ok());
    }

    #[test]
    fn check_error_ignores_falsy_error() {
        for falsy in [json!(null), json!(false), json!(0), json!(""), json!({}), json!([])] {
            let response = json!({ "error": falsy });
            assert!(check_error_in_response(&response).is_ok(), "{response}");
        }
    }

    #[test]
    fn check_error_flags_error_without_details() {
        let err = check_error_in_response(&json!({ "error": { "error_code": 5 } })).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));

        let err = check_error_in_response(&json!({ "error": "oops" })).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn get_upload_url_sends_credentials() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/method/photos.getWallUploadServer")
                .query_param("access_token", "token")
                .query_param("v", "5.131")
                .query_param("group_id", "123");
            then.status(200).json_body(json!({
                "response": { "upload_url": "https://upload.example/p", "album_id": -14 }
            }));
        });

        let url = client(&server).get_upload_url().await.unwrap();

        assert_eq!(url, "https://upload.example/p");
        mock.assert_calls(1);
    }

    #[tokio::test]
    async fn get_upload_url_returns_api_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/method/photos.getWallUploadServer");
            then.status(200).json_body(error_payload());
        });

        let err = client(&server).get_upload_url().await.unwrap_err();
        assert_eq!(err.to_string(), "Error 100 - bad");
    }

    #[tokio::test]
    async fn upload_photo_sends_multipart_field() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/upload").is_true(|req| {
                let body = String::from_utf8_lossy(req.body().as_ref());
                body.contains("name=\"photo\"")
                    && body.contains("filename=\"comic.png\"")
                    && body.contains("PNGDATA")
            });
            then.status(200)
                .json_body(json!({ "server": 1, "photo": "abc123", "hash": "h" }));
        });

        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("comic.png");
        tokio::fs::write(&path, b"PNGDATA").await.unwrap();

        let uploaded = client(&server)
            .upload_photo(&path, &server.url("/upload"))
            .await
            .unwrap();

        assert_eq!(uploaded.get("server"), Some(&json!(1)));
        assert_eq!(uploaded.get("photo"), Some(&json!("abc123")));
        assert_eq!(uploaded.get("hash"), Some(&json!("h")));
        mock.assert_calls(1);
    }

    #[tokio::test]
    async fn upload_photo_returns_api_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/upload");
            then.status(200).json_body(error_payload());
        });

        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("comic.png");
        tokio::fs::write(&path, b"PNGDATA").await.unwrap();

        let err = client(&server)
            .upload_photo(&path, &server.url("/upload"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Error 100 - bad");
    }

    #[tokio::test]
    async fn upload_photo_fails_for_missing_file() {
        let server = MockServer::start_async().await;
        let dir = tempdir().expect("tempdir");

        let err = client(&server)
            .upload_photo(&dir.path().join("absent.png"), &server.url("/upload"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IoError(_)));
    }

    #[tokio::test]
    async fn save_wall_photo_merges_fields_and_builds_attachment() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/method/photos.saveWallPhoto")
                .query_param("server", "1")
                .query_param("photo", "abc123")
                .query_param("hash", "h")
                .query_param("access_token", "token")
                .query_param("v", "5.131")
                .query_param("group_id", "123");
            then.status(200)
                .json_body(json!({ "response": [{ "id": 222, "owner_id": 111 }] }));
        });

        let mut uploaded = UploadedPhoto::new();
        uploaded.insert("server".to_string(), json!(1));
        uploaded.insert("photo".to_string(), json!("abc123"));
        uploaded.insert("hash".to_string(), json!("h"));

        let attachment = client(&server).save_wall_photo(uploaded).await.unwrap();

        assert_eq!(attachment.to_string(), "photo111_222");
        mock.assert_calls(1);
    }

    #[tokio::test]
    async fn save_wall_photo_credentials_override_upload_fields() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/method/photos.saveWallPhoto")
                .query_param("group_id", "123");
            then.status(200)
                .json_body(json!({ "response": [{ "id": 1, "owner_id": 2 }] }));
        });

        let mut uploaded = UploadedPhoto::new();
        uploaded.insert("group_id".to_string(), json!("999"));

        client(&server).save_wall_photo(uploaded).await.unwrap();
        mock.assert_calls(1);
    }

    #[tokio::test]
    async fn save_wall_photo_rejects_empty_response() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/method/photos.saveWallPhoto");
            then.status(200).json_body(json!({ "response": [] }));
        });

        let err = client(&server)
            .save_wall_photo(UploadedPhoto::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn save_wall_photo_returns_api_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/method/photos.saveWallPhoto");
            then.status(200).json_body(error_payload());
        });

        let err = client(&server)
            .save_wall_photo(UploadedPhoto::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Error 100 - bad");
    }

    #[tokio::test]
    async fn post_photo_posts_as_group() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/method/wall.post")
                .query_param("access_token", "token")
                .query_param("v", "5.131")
                .query_param("from_group", "1")
                .query_param("owner_id", "-123")
                .query_param("attachments", "photo111_222")
                .query_param("message", "hi");
            then.status(200)
                .json_body(json!({ "response": { "post_id": 77 } }));
        });

        let attachment = AttachmentId {
            owner_id: 111,
            media_id: 222,
        };
        let response = client(&server).post_photo(&attachment, "hi").await.unwrap();

        assert_eq!(response["response"]["post_id"], json!(77));
        mock.assert_calls(1);
    }

    #[tokio::test]
    async fn post_photo_returns_api_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/method/wall.post");
            then.status(200).json_body(error_payload());
        });

        let attachment = AttachmentId {
            owner_id: 111,
            media_id: 222,
        };
        let err = client(&server)
            .post_photo(&attachment, "hi")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Error 100 - bad");
    }

    #[tokio::test]
    async fn http_status_error_is_propagated() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/method/photos.getWallUploadServer");
            then.status(500);
        });

        let err = client(&server).get_upload_url().await.unwrap_err();
        assert!(matches!(err, Error::Http(_)));
    }
}
