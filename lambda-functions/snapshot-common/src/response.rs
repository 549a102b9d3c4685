use serde::{Deserialize, Serialize};

/// Invocation result in the `{"statusCode": ..., "body": ...}` shape
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Response<B> {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: B,
}

impl<B> Response<B> {
    pub fn ok(body: B) -> Self {
        Self {
            status_code: 200,
            body,
        }
    }
}
