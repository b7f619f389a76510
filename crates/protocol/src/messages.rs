use serde::{Deserialize, Deserializer, Serialize};

use crate::types::Profile;

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Exchanges a credential pair for a bearer token.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest<'a> {
    pub login_id: &'a str,
    pub password: &'a str,
}

/// Registers a transferred file under a catalog category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkAssetRequest {
    pub category_id: String,
    pub file_id: String,
    pub name: String,
}

/// Creates an asset record with the transferred file id injected.
///
/// Used only when [`LinkAssetRequest`] is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssetRequest {
    pub category_id: String,
    pub name: String,
    pub file_id: String,
}

/// Creates the sellable catalog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    pub price: u32,
    pub asset_id: String,
    pub category_id: String,
    pub currency: String,
}

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

/// Response to [`LoginRequest`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(alias = "accessToken", alias = "token")]
    pub auth_token: String,
    #[serde(default)]
    pub profile: Profile,
}

/// Response carrying the id of a created or linked asset.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssetCreated {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
}

/// Response to a build-status query.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BuildStatusResponse {
    #[serde(default, alias = "state")]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Coarse build state derived from [`BuildStatusResponse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildState {
    Pending,
    Ready,
    Failed(String),
}

impl BuildStatusResponse {
    /// Maps the free-form status string onto a [`BuildState`].
    pub fn state(&self) -> BuildState {
        match self.status.to_ascii_lowercase().as_str() {
            "ready" | "done" | "completed" | "complete" | "success" | "succeeded" => {
                BuildState::Ready
            }
            "failed" | "failure" | "error" | "rejected" => BuildState::Failed(
                self.message
                    .clone()
                    .unwrap_or_else(|| self.status.clone()),
            ),
            _ => BuildState::Pending,
        }
    }
}

/// Error body some endpoints return alongside a failure status.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorBody {
    /// Pulls a `message` field out of a raw error body, if it is JSON.
    pub fn message_from(body: &str) -> Option<String> {
        serde_json::from_str::<ApiErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.is_empty())
    }
}

/// Accepts `"abc"` or `123` for identifier fields.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Str(String),
        Num(i64),
    }

    match Id::deserialize(deserializer)? {
        Id::Str(s) => Ok(s),
        Id::Num(n) => Ok(n.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_request_wire_names() {
        let req = LoginRequest {
            login_id: "owner",
            password: "pw",
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({"loginId": "owner", "password": "pw"}));
    }

    #[test]
    fn login_response_accepts_token_aliases() {
        let a: LoginResponse =
            serde_json::from_str(r#"{"authToken":"t1","profile":{"name":"N","userId":"u"}}"#)
                .unwrap();
        assert_eq!(a.auth_token, "t1");
        assert_eq!(a.profile.user_id, "u");

        let b: LoginResponse = serde_json::from_str(r#"{"accessToken":"t2"}"#).unwrap();
        assert_eq!(b.auth_token, "t2");
        assert_eq!(b.profile, Profile::default());
    }

    #[test]
    fn link_and_create_payload_shapes() {
        let link = LinkAssetRequest {
            category_id: "DR_TOP_01".into(),
            file_id: "f1".into(),
            name: "shirt.zepeto".into(),
        };
        assert_eq!(
            serde_json::to_value(&link).unwrap(),
            serde_json::json!({"categoryId": "DR_TOP_01", "fileId": "f1", "name": "shirt.zepeto"})
        );

        let item = CreateItemRequest {
            price: 5,
            asset_id: "a1".into(),
            category_id: "DR_TOP_01".into(),
            currency: "ZEM".into(),
        };
        assert_eq!(
            serde_json::to_value(&item).unwrap(),
            serde_json::json!({"price": 5, "assetId": "a1", "categoryId": "DR_TOP_01", "currency": "ZEM"})
        );
    }

    #[test]
    fn asset_created_numeric_id() {
        let a: AssetCreated = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        assert_eq!(a.id, "42");
        let b: AssetCreated = serde_json::from_str(r#"{"id": "as-9", "extra": true}"#).unwrap();
        assert_eq!(b.id, "as-9");
    }

    #[test]
    fn build_status_mapping() {
        let ready: BuildStatusResponse = serde_json::from_str(r#"{"status":"COMPLETED"}"#).unwrap();
        assert_eq!(ready.state(), BuildState::Ready);

        let failed: BuildStatusResponse =
            serde_json::from_str(r#"{"state":"error","message":"bad mesh"}"#).unwrap();
        assert_eq!(failed.state(), BuildState::Failed("bad mesh".into()));

        let pending: BuildStatusResponse = serde_json::from_str(r#"{"status":"queued"}"#).unwrap();
        assert_eq!(pending.state(), BuildState::Pending);
    }

    #[test]
    fn error_body_message() {
        assert_eq!(
            ApiErrorBody::message_from(r#"{"message":"price too low"}"#).as_deref(),
            Some("price too low")
        );
        assert_eq!(ApiErrorBody::message_from("<html>"), None);
        assert_eq!(ApiErrorBody::message_from(r#"{"message":""}"#), None);
    }
}
