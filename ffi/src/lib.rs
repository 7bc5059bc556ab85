//! C-ABI wrapper around `iguana-core`.
//!
//! # Overview
//! Exposes request building, response parsing and channel config editing
//! through `extern "C"` functions, so any language with a C FFI can drive
//! the Iguana API with its own HTTP stack.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - `iguana_build_*` / `iguana_parse_*` mirror the core client 1:1.
//! - A single `FfiIguanaResult` envelope with `FfiDataTag` + `void* data`
//!   conveys success payloads, server error envelopes and client errors.
//! - The C caller owns all returned pointers and must call the matching
//!   `iguana_free_*` (or `iguana_channel_free`) function to release them.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use iguana_core::{
    ApiError, ApiResult, Channel, ChannelLookup, ClientConfig, HttpRequest, HttpResponse, IguanaClient, StatusAction,
};

use types::*;

/// Borrow a C string as `&str`. Null or invalid UTF-8 yields `None`.
fn str_arg<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a new `IguanaClient`.
///
/// `base_url` is required. A null `username` or `password` falls back to
/// the server's trial defaults. Returns null if `base_url` is null or if an
/// internal panic occurs. Free with `iguana_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn iguana_client_new(
    base_url: *const c_char,
    username: *const c_char,
    password: *const c_char,
) -> *mut FfiIguanaClient {
    catch_unwind(|| {
        let Some(url) = str_arg(base_url) else {
            return std::ptr::null_mut();
        };
        let mut config = ClientConfig::default().with_base_url(url);
        if let Some(user) = str_arg(username) {
            config.username = user.to_string();
        }
        if let Some(pass) = str_arg(password) {
            config.password = pass.to_string();
        }
        Box::into_raw(Box::new(FfiIguanaClient {
            inner: IguanaClient::new(config),
        }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `iguana_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn iguana_client_free(client: *mut FfiIguanaClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(client) });
        });
    }
}

// ---------------------------------------------------------------------------
// Build request functions
// ---------------------------------------------------------------------------

/// Shared body of the `iguana_build_*` functions: null client, builder
/// error or panic all yield null.
fn build_with<F>(client: *const FfiIguanaClient, build: F) -> *mut FfiHttpRequest
where
    F: FnOnce(&IguanaClient) -> Option<Result<HttpRequest, ApiError>>,
{
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        match build(&client.inner) {
            Some(Ok(req)) => FfiHttpRequest::from_core(req),
            _ => std::ptr::null_mut(),
        }
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Build a POST to any endpoint with `len` form pairs taken from the
/// parallel `keys` / `values` arrays (both may be null when `len` is 0).
///
/// Returns null if `client` or `endpoint` is null, or if any pair is null.
#[unsafe(no_mangle)]
pub extern "C" fn iguana_build_api(
    client: *const FfiIguanaClient,
    endpoint: *const c_char,
    keys: *const *const c_char,
    values: *const *const c_char,
    len: u32,
) -> *mut FfiHttpRequest {
    build_with(client, |c| {
        let endpoint = str_arg(endpoint)?;
        let mut payload = Vec::with_capacity(len as usize);
        if len > 0 {
            if keys.is_null() || values.is_null() {
                return None;
            }
            let keys = unsafe { std::slice::from_raw_parts(keys, len as usize) };
            let values = unsafe { std::slice::from_raw_parts(values, len as usize) };
            for (k, v) in keys.iter().zip(values) {
                payload.push((str_arg(*k)?, str_arg(*v)?));
            }
        }
        Some(c.build_api(endpoint, &payload))
    })
}

/// Build a `current_version` request.
#[unsafe(no_mangle)]
pub extern "C" fn iguana_build_version(client: *const FfiIguanaClient) -> *mut FfiHttpRequest {
    build_with(client, |c| Some(c.build_version()))
}

/// Build a `monitor_query` request.
#[unsafe(no_mangle)]
pub extern "C" fn iguana_build_monitor(client: *const FfiIguanaClient) -> *mut FfiHttpRequest {
    build_with(client, |c| Some(c.build_monitor()))
}

/// Build an `api_query` (log messages) request.
#[unsafe(no_mangle)]
pub extern "C" fn iguana_build_log_messages(client: *const FfiIguanaClient) -> *mut FfiHttpRequest {
    build_with(client, |c| Some(c.build_log_messages()))
}

/// Build a `get_server_config` request.
#[unsafe(no_mangle)]
pub extern "C" fn iguana_build_server_config(client: *const FfiIguanaClient) -> *mut FfiHttpRequest {
    build_with(client, |c| Some(c.build_server_config()))
}

/// Build a `status` request.
#[unsafe(no_mangle)]
pub extern "C" fn iguana_build_status(client: *const FfiIguanaClient) -> *mut FfiHttpRequest {
    build_with(client, |c| Some(c.build_status()))
}

/// Build a `status` request that stops every channel.
#[unsafe(no_mangle)]
pub extern "C" fn iguana_build_channel_stop_all(client: *const FfiIguanaClient) -> *mut FfiHttpRequest {
    build_with(client, |c| Some(c.build_status_action(StatusAction::StopAll)))
}

/// Build a `status` request that starts every channel.
#[unsafe(no_mangle)]
pub extern "C" fn iguana_build_channel_start_all(client: *const FfiIguanaClient) -> *mut FfiHttpRequest {
    build_with(client, |c| Some(c.build_status_action(StatusAction::StartAll)))
}

/// Build a `get_default_config` request. Returns null if either component is null.
#[unsafe(no_mangle)]
pub extern "C" fn iguana_build_default_config(
    client: *const FfiIguanaClient,
    source: *const c_char,
    destination: *const c_char,
) -> *mut FfiHttpRequest {
    build_with(client, |c| {
        Some(c.build_default_config(str_arg(source)?, str_arg(destination)?))
    })
}

/// Build a `get_channel_config` request. `key` is a GUID, or a channel name
/// when `is_name` is true. Returns null if `key` is null or not a valid GUID.
#[unsafe(no_mangle)]
pub extern "C" fn iguana_build_channel_config(
    client: *const FfiIguanaClient,
    key: *const c_char,
    is_name: bool,
) -> *mut FfiHttpRequest {
    build_with(client, |c| {
        let key = str_arg(key)?;
        let lookup = if is_name {
            ChannelLookup::Name(key.to_string())
        } else {
            ChannelLookup::Guid(uuid::Uuid::try_parse(key).ok()?)
        };
        Some(c.build_channel_config(&lookup))
    })
}

/// Build an `update_channel` request carrying the serialized `channel`.
#[unsafe(no_mangle)]
pub extern "C" fn iguana_build_channel_update(
    client: *const FfiIguanaClient,
    channel: *const FfiChannel,
) -> *mut FfiHttpRequest {
    build_with(client, |c| {
        if channel.is_null() {
            return None;
        }
        let channel = unsafe { &*channel };
        Some(c.build_channel_update(&channel.inner))
    })
}

// ---------------------------------------------------------------------------
// Parse response functions
// ---------------------------------------------------------------------------

/// Convert an `FfiHttpResponse` to a core `HttpResponse`. A null body is
/// treated as empty.
fn ffi_response_to_core(resp: &FfiHttpResponse) -> HttpResponse {
    HttpResponse {
        status: resp.status,
        headers: Vec::new(),
        body: str_arg(resp.body).unwrap_or("").to_string(),
    }
}

/// Parse the response of any request whose payload is opaque text.
///
/// Returns `data_tag = Text` with the raw body on success, or
/// `error_code = Server` for an error envelope.
#[unsafe(no_mangle)]
pub extern "C" fn iguana_parse_result(
    client: *const FfiIguanaClient,
    response: *const FfiHttpResponse,
) -> *mut FfiIguanaResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiIguanaResult::null_arg("client");
        }
        if response.is_null() {
            return FfiIguanaResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let resp = unsafe { &*response };
        match client.inner.parse_api(ffi_response_to_core(resp)) {
            Ok(ApiResult::Success(body)) => FfiIguanaResult::ok_text(body),
            Ok(ApiResult::ServerError { code, description }) => FfiIguanaResult::server_error(code, description),
            Err(e) => FfiIguanaResult::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiIguanaResult::panic("panic in iguana_parse_result"))
}

/// Parse a `current_version` response.
///
/// Returns `data_tag = Version` on success.
#[unsafe(no_mangle)]
pub extern "C" fn iguana_parse_version(
    client: *const FfiIguanaClient,
    response: *const FfiHttpResponse,
) -> *mut FfiIguanaResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiIguanaResult::null_arg("client");
        }
        if response.is_null() {
            return FfiIguanaResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let resp = unsafe { &*response };
        match client.inner.parse_version(ffi_response_to_core(resp)) {
            Ok(version) => FfiIguanaResult::ok_version(version),
            Err(e) => FfiIguanaResult::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiIguanaResult::panic("panic in iguana_parse_version"))
}

// ---------------------------------------------------------------------------
// Channel config editing
// ---------------------------------------------------------------------------

/// Parse a channel configuration document.
///
/// Returns null if `config` is null or has no `<channel>` element.
/// Free with `iguana_channel_free`.
#[unsafe(no_mangle)]
pub extern "C" fn iguana_channel_new(config: *const c_char) -> *mut FfiChannel {
    catch_unwind(|| {
        let Some(config) = str_arg(config) else {
            return std::ptr::null_mut();
        };
        match Channel::parse(config) {
            Ok(inner) => Box::into_raw(Box::new(FfiChannel { inner })),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Current value of `field`, or null if the element or attribute is absent.
/// Free with `iguana_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn iguana_channel_get(channel: *const FfiChannel, field: FfiChannelField) -> *mut c_char {
    catch_unwind(|| {
        if channel.is_null() {
            return std::ptr::null_mut();
        }
        let channel = unsafe { &*channel };
        match channel.inner.get(field.into()) {
            Ok(value) => c_string(value),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Store `value` for `field`.
#[unsafe(no_mangle)]
pub extern "C" fn iguana_channel_set(
    channel: *mut FfiChannel,
    field: FfiChannelField,
    value: *const c_char,
) -> FfiErrorCode {
    catch_unwind(AssertUnwindSafe(|| {
        if channel.is_null() || value.is_null() {
            return FfiErrorCode::NullArg;
        }
        let Some(value) = str_arg(value) else {
            return FfiErrorCode::InvalidArg;
        };
        let channel = unsafe { &mut *channel };
        match channel.inner.set(field.into(), value) {
            Ok(()) => FfiErrorCode::Ok,
            Err(_) => FfiErrorCode::Channel,
        }
    }))
    .unwrap_or(FfiErrorCode::Panic)
}

/// Serialize the whole document. Free with `iguana_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn iguana_channel_to_string(channel: *const FfiChannel) -> *mut c_char {
    catch_unwind(|| {
        if channel.is_null() {
            return std::ptr::null_mut();
        }
        let channel = unsafe { &*channel };
        match channel.inner.to_xml() {
            Ok(xml) => c_string(xml),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a channel created by `iguana_channel_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn iguana_channel_free(channel: *mut FfiChannel) {
    if !channel.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(channel) });
        });
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

/// Free an `FfiHttpRequest` returned by any `iguana_build_*` function.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn iguana_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        free_c_string(req.url);
        free_c_string(req.body);
        if !req.headers.is_null() && req.headers_len > 0 {
            let headers = unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(req.headers, req.headers_len as usize))
            };
            for h in headers.iter() {
                free_c_string(h.key);
                free_c_string(h.value);
            }
        }
    });
}

/// Free an `FfiIguanaResult` returned by any `iguana_parse_*` function.
/// Safe to call with null. Uses `data_tag` to determine what `data` points to.
#[unsafe(no_mangle)]
pub extern "C" fn iguana_free_result(result: *mut FfiIguanaResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        free_c_string(result.error_message);
        if !result.data.is_null() {
            match result.data_tag {
                FfiDataTag::Text => free_c_string(result.data as *mut c_char),
                FfiDataTag::Version => {
                    let version = unsafe { Box::from_raw(result.data as *mut FfiVersion) };
                    free_c_string(version.build_ext);
                    free_c_string(version.display);
                }
                FfiDataTag::None => {}
            }
        }
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn iguana_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| free_c_string(s));
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
