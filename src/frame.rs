/// Frame messages
///
/// Events exchanged with the embedded (email) wallet frame. App events go
/// to the frame, frame events come back as the success or error answer to
/// each of them. On the wire every event is `{ "type": ..., "payload": ... }`.
///
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppConnectEmailRequest {
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppConnectOtpRequest {
    pub otp: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSwitchNetworkRequest {
    pub chain_id: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectEmailAction {
    VerifyDevice,
    VerifyOtp,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameConnectEmailResponse {
    pub action: ConnectEmailAction,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameGetChainIdResponse {
    pub chain_id: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameGetUserResponse {
    pub email: String,
    pub address: String,
    pub chain_id: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameIsConnectedResponse {
    pub is_connected: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameError {
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub rpc_url: String,
    pub chain_id: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum AppEvent {
    #[serde(rename = "@w3m-app/CONNECT_EMAIL")]
    ConnectEmail(AppConnectEmailRequest),
    #[serde(rename = "@w3m-app/CONNECT_DEVICE")]
    ConnectDevice,
    #[serde(rename = "@w3m-app/CONNECT_OTP")]
    ConnectOtp(AppConnectOtpRequest),
    #[serde(rename = "@w3m-app/GET_USER")]
    GetUser,
    #[serde(rename = "@w3m-app/IS_CONNECTED")]
    IsConnected,
    #[serde(rename = "@w3m-app/GET_CHAIN_ID")]
    GetChainId,
    #[serde(rename = "@w3m-app/SWITCH_NETWORK")]
    SwitchNetwork(AppSwitchNetworkRequest),
    #[serde(rename = "@w3m-app/SIGN_OUT")]
    SignOut,
}

impl AppEvent {
    /// Rejects malformed payloads before they are posted to the frame.
    pub fn validate(&self) -> Result<()> {
        match self {
            AppEvent::ConnectEmail(request) => validate_email(&request.email),
            AppEvent::ConnectOtp(request) => validate_otp(&request.otp),
            AppEvent::SwitchNetwork(request) => validate_chain_id(request.chain_id),
            _ => Ok(()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum FrameEvent {
    #[serde(rename = "@w3m-frame/CONNECT_EMAIL_SUCCESS")]
    ConnectEmailSuccess(FrameConnectEmailResponse),
    #[serde(rename = "@w3m-frame/CONNECT_EMAIL_ERROR")]
    ConnectEmailError(FrameError),
    #[serde(rename = "@w3m-frame/CONNECT_DEVICE_SUCCESS")]
    ConnectDeviceSuccess,
    #[serde(rename = "@w3m-frame/CONNECT_DEVICE_ERROR")]
    ConnectDeviceError(FrameError),
    #[serde(rename = "@w3m-frame/CONNECT_OTP_SUCCESS")]
    ConnectOtpSuccess,
    #[serde(rename = "@w3m-frame/CONNECT_OTP_ERROR")]
    ConnectOtpError(FrameError),
    #[serde(rename = "@w3m-frame/GET_USER_SUCCESS")]
    GetUserSuccess(FrameGetUserResponse),
    #[serde(rename = "@w3m-frame/GET_USER_ERROR")]
    GetUserError(FrameError),
    #[serde(rename = "@w3m-frame/IS_CONNECTED_SUCCESS")]
    IsConnectedSuccess(FrameIsConnectedResponse),
    #[serde(rename = "@w3m-frame/IS_CONNECTED_ERROR")]
    IsConnectedError(FrameError),
    #[serde(rename = "@w3m-frame/GET_CHAIN_ID_SUCCESS")]
    GetChainIdSuccess(FrameGetChainIdResponse),
    #[serde(rename = "@w3m-frame/GET_CHAIN_ID_ERROR")]
    GetChainIdError(FrameError),
    #[serde(rename = "@w3m-frame/SWITCH_NETWORK_SUCCESS")]
    SwitchNetworkSuccess(FrameGetChainIdResponse),
    #[serde(rename = "@w3m-frame/SWITCH_NETWORK_ERROR")]
    SwitchNetworkError(FrameError),
    #[serde(rename = "@w3m-frame/SIGN_OUT_SUCCESS")]
    SignOutSuccess,
    #[serde(rename = "@w3m-frame/SIGN_OUT_ERROR")]
    SignOutError(FrameError),
}

impl FrameEvent {
    pub fn is_error(&self) -> bool {
        self.error_message().is_some()
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            FrameEvent::ConnectEmailError(e)
            | FrameEvent::ConnectDeviceError(e)
            | FrameEvent::ConnectOtpError(e)
            | FrameEvent::GetUserError(e)
            | FrameEvent::IsConnectedError(e)
            | FrameEvent::GetChainIdError(e)
            | FrameEvent::SwitchNetworkError(e)
            | FrameEvent::SignOutError(e) => Some(&e.message),
            _ => None,
        }
    }

    /// Whether this event answers `request`.
    pub fn answers(&self, request: &AppEvent) -> bool {
        use FrameEvent::*;
        matches!(
            (request, self),
            (AppEvent::ConnectEmail(_), ConnectEmailSuccess(_) | ConnectEmailError(_))
                | (AppEvent::ConnectDevice, ConnectDeviceSuccess | ConnectDeviceError(_))
                | (AppEvent::ConnectOtp(_), ConnectOtpSuccess | ConnectOtpError(_))
                | (AppEvent::GetUser, GetUserSuccess(_) | GetUserError(_))
                | (AppEvent::IsConnected, IsConnectedSuccess(_) | IsConnectedError(_))
                | (AppEvent::GetChainId, GetChainIdSuccess(_) | GetChainIdError(_))
                | (
                    AppEvent::SwitchNetwork(_),
                    SwitchNetworkSuccess(_) | SwitchNetworkError(_)
                )
                | (AppEvent::SignOut, SignOutSuccess | SignOutError(_))
        )
    }
}

/// Parses a raw frame message, checking the payload the same way outgoing
/// app events are checked.
pub fn parse_frame_event(raw: &str) -> Result<FrameEvent> {
    let event: FrameEvent = serde_json::from_str(raw)
        .map_err(|e| Error::InvalidFrameMessage(e.to_string()))?;
    match &event {
        FrameEvent::GetUserSuccess(user) => {
            validate_email(&user.email)?;
            validate_chain_id(user.chain_id)?;
        }
        FrameEvent::GetChainIdSuccess(r) | FrameEvent::SwitchNetworkSuccess(r) => {
            validate_chain_id(r.chain_id)?;
        }
        _ => {}
    }
    Ok(event)
}

pub fn validate_email(email: &str) -> Result<()> {
    let invalid = || Error::InvalidFrameMessage(format!("invalid email: {email}"));
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    let valid = !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(name, tld)| !name.is_empty() && !tld.is_empty())
        && !domain.ends_with('.');
    if valid { Ok(()) } else { Err(invalid()) }
}

/// One-time passwords are six digits.
pub fn validate_otp(otp: &str) -> Result<()> {
    if otp.len() == 6 && otp.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(Error::InvalidFrameMessage(format!("invalid otp: {otp}")))
    }
}

pub fn validate_chain_id(chain_id: u64) -> Result<()> {
    if chain_id == 0 {
        return Err(Error::InvalidFrameMessage("invalid chain id: 0".to_string()));
    }
    Ok(())
}
