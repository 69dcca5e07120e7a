use serde::{
    Deserialize,
    Serialize,
    de::DeserializeOwned,
};
use serde_json::Value;
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{
            AtomicU64,
            Ordering,
        },
    },
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RpcError {
    Transport(String),
    Rpc { code: i64, message: String },
    Decode(String),
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcError::Transport(msg) => write!(f, "rpc transport error: {msg}"),
            RpcError::Rpc { code, message } => write!(f, "rpc error {code}: {message}"),
            RpcError::Decode(msg) => write!(f, "invalid rpc payload: {msg}"),
        }
    }
}

impl std::error::Error for RpcError {}

#[derive(Serialize)]
struct RequestDto<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct ErrorDto {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct ResponseDto {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ErrorDto>,
}

/// Minimal JSON-RPC 2.0 client over HTTP.
#[derive(Clone)]
pub struct JsonRpcClient {
    url: String,
    http: reqwest::Client,
    next_id: Arc<AtomicU64>,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| RpcError::Transport(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            http,
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = RequestDto {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        tracing::debug!(%method, id, url = %self.url, "rpc request");
        let res = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;
        let status = res.status();
        let bytes = res
            .bytes()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;
        // Wallet endpoints answer EIP-1193 errors with non-2xx codes and a JSON-RPC body.
        let dto: ResponseDto = serde_json::from_slice(&bytes).map_err(|e| {
            if status.is_success() {
                RpcError::Decode(e.to_string())
            } else {
                RpcError::Transport(format!(
                    "{status}: {}",
                    String::from_utf8_lossy(&bytes)
                ))
            }
        })?;
        decode_response(dto)
    }
}

fn decode_response<T: DeserializeOwned>(dto: ResponseDto) -> Result<T, RpcError> {
    if let Some(err) = dto.error {
        return Err(RpcError::Rpc {
            code: err.code,
            message: err.message,
        });
    }
    let value = dto.result.unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| RpcError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn decode_response__error_object_wins_over_result() {
        // given
        let dto: ResponseDto = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":4001,"message":"User rejected the request."}}"#,
        )
        .unwrap();

        // when
        let res: Result<Vec<String>, _> = decode_response(dto);

        // then
        assert_eq!(
            res,
            Err(RpcError::Rpc {
                code: 4001,
                message: "User rejected the request.".to_string()
            })
        );
    }

    #[test]
    fn decode_response__null_result_decodes_into_option() {
        let dto: ResponseDto =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":3,"result":null}"#).unwrap();

        let res: Option<String> = decode_response(dto).unwrap();

        assert_eq!(res, None);
    }
}
