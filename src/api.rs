use std::path::{Path, PathBuf};

use futures_util::{Stream, StreamExt};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::protocol::ProgressSink;

const UPLOAD_CHUNK_BYTES: usize = 128 * 1024;

/// API error name the server uses when the account has two-step verification.
pub const PASSWORD_REQUIRED_ERROR: &str = "SESSION_PASSWORD_NEEDED";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unexpected status: {0}")]
    Status(u16),
    #[error("api error: {error} ({description})")]
    Api { error: String, description: String },
}

impl ApiError {
    pub fn is_password_required(&self) -> bool {
        matches!(self, ApiError::Api { error, .. } if error == PASSWORD_REQUIRED_ERROR)
    }
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    pub async fn send_sms_code(&self, phone_number: &str) -> Result<SendCodeResult, ApiError> {
        let url = format!("{}/sendSmsCode", self.base_url);
        let mut payload = serde_json::Map::new();
        payload.insert("phoneNumber".to_string(), json!(phone_number));
        self.post(url, None, payload).await
    }

    pub async fn verify_sms_code(
        &self,
        phone_number: &str,
        code: &str,
        client_version: &str,
        device_name: Option<&str>,
    ) -> Result<VerifyCodeResult, ApiError> {
        let url = format!("{}/verifySmsCode", self.base_url);
        let mut payload = serde_json::Map::new();
        payload.insert("phoneNumber".to_string(), json!(phone_number));
        payload.insert("code".to_string(), json!(code));
        payload.insert("clientType".to_string(), json!("cli"));
        payload.insert("clientVersion".to_string(), json!(client_version));
        if let Some(device_name) = device_name {
            payload.insert("deviceName".to_string(), json!(device_name));
        }
        self.post(url, None, payload).await
    }

    pub async fn verify_password(&self, phone_number: &str, password: &str) -> Result<VerifyCodeResult, ApiError> {
        let url = format!("{}/verifyPassword", self.base_url);
        let mut payload = serde_json::Map::new();
        payload.insert("phoneNumber".to_string(), json!(phone_number));
        payload.insert("password".to_string(), json!(password));
        self.post(url, None, payload).await
    }

    pub async fn logout(&self, token: &str) -> Result<LogoutResult, ApiError> {
        let url = format!("{}/logout", self.base_url);
        self.post(url, Some(token), serde_json::Map::new()).await
    }

    /// Streams the file body so `progress` follows the bytes handed to the transport.
    pub async fn upload_file(
        &self,
        token: &str,
        input: UploadFileInput,
        progress: ProgressSink,
    ) -> Result<UploadFileResult, ApiError> {
        let url = format!("{}/uploadFile", self.base_url);
        let bytes = tokio::fs::read(&input.path).await?;
        let total = bytes.len() as u64;
        let chunks: Vec<Vec<u8>> = bytes.chunks(UPLOAD_CHUNK_BYTES).map(<[u8]>::to_vec).collect();

        progress(0, total);
        let mut sent = 0u64;
        let body = futures_util::stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len() as u64;
            progress(sent, total);
            Ok::<Vec<u8>, std::io::Error>(chunk)
        }));

        let mut file_part = reqwest::multipart::Part::stream_with_length(reqwest::Body::wrap_stream(body), total)
            .file_name(input.file_name);
        if let Some(mime) = input.mime_type {
            file_part = file_part.mime_str(&mime)?;
        }
        let form = reqwest::multipart::Form::new()
            .text("type", input.kind.as_str())
            .part("file", file_part);

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;
        decode_response(response).await
    }

    /// Downloads `url` into `destination`, returning the number of bytes written.
    pub async fn download_to(
        &self,
        url: &str,
        destination: &Path,
        expected_size: Option<u64>,
        progress: &ProgressSink,
    ) -> Result<u64, ApiError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        let total = response.content_length().or(expected_size).unwrap_or(0);

        save_stream(response.bytes_stream(), destination, total, progress).await
    }

    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        url: String,
        token: Option<&str>,
        payload: serde_json::Map<String, serde_json::Value>,
    ) -> Result<T, ApiError> {
        let mut request = self.http.post(url).json(&payload);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        decode_response(response).await
    }
}

/// Writes `stream` to `destination`. A failed transfer leaves no partial file.
async fn save_stream<S, B, E>(
    stream: S,
    destination: &Path,
    total: u64,
    progress: &ProgressSink,
) -> Result<u64, ApiError>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    ApiError: From<E>,
{
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::File::create(destination).await?;
    progress(0, total);
    let written = write_stream(stream, &mut file, total, progress).await;
    drop(file);
    if written.is_err() {
        if let Err(error) = tokio::fs::remove_file(destination).await {
            warn!(%error, path = %destination.display(), "could not remove partial download");
        }
    }
    written
}

async fn write_stream<S, B, E>(
    mut stream: S,
    file: &mut tokio::fs::File,
    total: u64,
    progress: &ProgressSink,
) -> Result<u64, ApiError>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    ApiError: From<E>,
{
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let chunk = chunk.as_ref();
        file.write_all(chunk).await?;
        written += chunk.len() as u64;
        progress(written, total.max(written));
    }
    file.flush().await?;
    Ok(written)
}

async fn decode_response<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await?;
    // Error envelopes may arrive with a non-2xx status.
    match serde_json::from_str::<ApiResponse<T>>(&body) {
        Ok(ApiResponse::Ok { result, .. }) if status.is_success() => Ok(result),
        Ok(ApiResponse::Err { error, description, .. }) => Err(ApiError::Api {
            error,
            description: description.unwrap_or_else(|| "Unknown error".to_string()),
        }),
        _ => Err(ApiError::Status(status.as_u16())),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCodeResult {
    pub existing_user: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCodeResult {
    pub user_id: i64,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct LogoutResult {}

#[derive(Debug, Clone)]
pub struct UploadFileInput {
    pub path: PathBuf,
    pub file_name: String,
    pub mime_type: Option<String>,
    pub kind: crate::protocol::UploadKind,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UploadFileResult {
    pub photo_id: Option<i64>,
    pub document_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged, rename_all = "camelCase")]
enum ApiResponse<T> {
    Ok {
        #[allow(dead_code)]
        ok: bool,
        result: T,
    },
    Err {
        #[allow(dead_code)]
        ok: bool,
        error: String,
        #[allow(dead_code)]
        error_code: Option<i32>,
        description: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_required_is_recognized_by_error_name() {
        let error = ApiError::Api {
            error: PASSWORD_REQUIRED_ERROR.to_string(),
            description: "Two-step verification is enabled".to_string(),
        };
        assert!(error.is_password_required());

        let error = ApiError::Api {
            error: "PHONE_CODE_INVALID".to_string(),
            description: "Wrong code".to_string(),
        };
        assert!(!error.is_password_required());
        assert!(!ApiError::Status(500).is_password_required());
    }

    #[test]
    fn envelopes_decode_into_ok_and_err() {
        let ok: ApiResponse<VerifyCodeResult> =
            serde_json::from_str(r#"{"ok":true,"result":{"userId":5,"token":"5:abc"}}"#).expect("ok envelope");
        match ok {
            ApiResponse::Ok { result, .. } => {
                assert_eq!(result.user_id, 5);
                assert_eq!(result.token, "5:abc");
            }
            ApiResponse::Err { .. } => panic!("expected ok envelope"),
        }

        let err: ApiResponse<VerifyCodeResult> = serde_json::from_str(
            r#"{"ok":false,"error":"SESSION_PASSWORD_NEEDED","errorCode":401,"description":"password"}"#,
        )
        .expect("err envelope");
        assert!(matches!(err, ApiResponse::Err { error, .. } if error == PASSWORD_REQUIRED_ERROR));
    }

    #[tokio::test]
    async fn interrupted_download_leaves_no_partial_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let destination = dir.path().join("usermedia").join("41.jpg");
        let chunks: Vec<Result<Vec<u8>, std::io::Error>> = vec![
            Ok(b"first".to_vec()),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ];
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink_seen = std::sync::Arc::clone(&seen);
        let progress: ProgressSink = std::sync::Arc::new(move |done, total| {
            sink_seen.lock().expect("seen lock").push((done, total));
        });

        let err = save_stream(futures_util::stream::iter(chunks), &destination, 10, &progress)
            .await
            .expect_err("stream fails");

        assert!(matches!(err, ApiError::Io(_)));
        assert!(!destination.exists());
        assert_eq!(seen.lock().expect("seen lock").clone(), vec![(0, 10), (5, 10)]);
    }

    #[tokio::test]
    async fn completed_download_is_kept() {
        let dir = tempfile::tempdir().expect("tempdir");
        let destination = dir.path().join("42.bin");
        let chunks: Vec<Result<Vec<u8>, std::io::Error>> = vec![Ok(b"abc".to_vec()), Ok(b"de".to_vec())];
        let progress: ProgressSink = std::sync::Arc::new(|_, _| {});

        let written = save_stream(futures_util::stream::iter(chunks), &destination, 0, &progress)
            .await
            .expect("saved");

        assert_eq!(written, 5);
        assert_eq!(std::fs::read(&destination).expect("read back"), b"abcde");
    }
}
