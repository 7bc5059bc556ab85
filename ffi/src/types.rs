//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointers instead of `Vec`, and
//! tagged enums with explicit discriminants. Conversion functions live here
//! to keep `lib.rs` focused on the `extern "C"` surface.

use std::ffi::CString;
use std::os::raw::c_char;

use iguana_core::{ApiError, Channel, ChannelField, IguanaClient, Version};

/// Opaque handle to an `IguanaClient`.
pub struct FfiIguanaClient {
    pub(crate) inner: IguanaClient,
}

/// Opaque handle to a parsed channel configuration.
pub struct FfiChannel {
    pub(crate) inner: Channel,
}

/// Heap-allocate a C string. Interior NUL bytes are dropped.
pub(crate) fn c_string(s: impl Into<String>) -> *mut c_char {
    let mut s = s.into();
    s.retain(|c| c != '\0');
    CString::new(s).unwrap_or_default().into_raw()
}

// ---------------------------------------------------------------------------
// Channel fields
// ---------------------------------------------------------------------------

/// Editable channel configuration fields.
#[repr(C)]
#[derive(Clone, Copy)]
pub enum FfiChannelField {
    Name = 0,
    StartAutomatically = 1,
    Port = 2,
    DatabaseReconnectionInterval = 3,
    MaximumDatabaseReconnections = 4,
    DatabaseTimeoutSeconds = 5,
    ActionOnParseError = 6,
    ActionOnDbError = 7,
}

impl From<FfiChannelField> for ChannelField {
    fn from(f: FfiChannelField) -> Self {
        match f {
            FfiChannelField::Name => ChannelField::Name,
            FfiChannelField::StartAutomatically => ChannelField::StartAutomatically,
            FfiChannelField::Port => ChannelField::Port,
            FfiChannelField::DatabaseReconnectionInterval => ChannelField::DatabaseReconnectionInterval,
            FfiChannelField::MaximumDatabaseReconnections => ChannelField::MaximumDatabaseReconnections,
            FfiChannelField::DatabaseTimeoutSeconds => ChannelField::DatabaseTimeoutSeconds,
            FfiChannelField::ActionOnParseError => ChannelField::ActionOnParseError,
            FfiChannelField::ActionOnDbError => ChannelField::ActionOnDbError,
        }
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// A form POST described as C-compatible plain data.
///
/// Built by `iguana_build_*` functions. The C caller POSTs `body` to `url`
/// with `headers` and passes the response back through `iguana_parse_*`.
#[repr(C)]
pub struct FfiHttpRequest {
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: iguana_core::HttpRequest) -> *mut Self {
        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Vec<FfiHeader> = req
                .headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: c_string(k),
                    value: c_string(v),
                })
                .collect();
            // released as a boxed slice by iguana_free_request
            Box::into_raw(ffi_headers.into_boxed_slice()) as *mut FfiHeader
        };

        Box::into_raw(Box::new(FfiHttpRequest {
            url: c_string(req.url),
            headers,
            headers_len,
            body: c_string(req.body),
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The C caller constructs this on the stack after executing a request,
/// then passes a pointer to an `iguana_parse_*` function. The FFI layer
/// reads but does not free these fields.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiIguanaResult` and by `iguana_channel_set`.
#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    Server = 1,
    Http = 2,
    Deserialization = 3,
    Serialization = 4,
    Panic = 5,
    NullArg = 6,
    Channel = 7,
    NotImplemented = 8,
    Transport = 9,
    InvalidArg = 10,
}

impl From<&ApiError> for FfiErrorCode {
    fn from(err: &ApiError) -> Self {
        match err {
            ApiError::Transport(_) => FfiErrorCode::Transport,
            ApiError::Server { .. } => FfiErrorCode::Server,
            ApiError::Http { .. } => FfiErrorCode::Http,
            ApiError::NotImplemented { .. } => FfiErrorCode::NotImplemented,
            ApiError::Deserialization(_) => FfiErrorCode::Deserialization,
            ApiError::Serialization(_) => FfiErrorCode::Serialization,
            ApiError::Channel(_) => FfiErrorCode::Channel,
            ApiError::Config(_) => FfiErrorCode::InvalidArg,
        }
    }
}

/// Tag that tells `iguana_free_result` what `FfiIguanaResult::data` points to.
#[repr(C)]
#[derive(Debug)]
pub enum FfiDataTag {
    None = 0,
    /// `data` is a NUL-terminated C string (the raw response body).
    Text = 1,
    /// `data` points to an `FfiVersion`.
    Version = 2,
}

/// Server version exposed to C. `build_ext` is null when absent.
#[repr(C)]
pub struct FfiVersion {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
    pub build_ext: *mut c_char,
    /// Dotted rendering, e.g. `"6.1.5"`.
    pub display: *mut c_char,
}

/// Result envelope for all parse operations.
///
/// On success `error_code` is `Ok`, `error_message` is null, and `data`
/// points to the payload (tagged by `data_tag`). A server error envelope
/// sets `error_code = Server`, `server_code` to the return code and
/// `error_message` to the description.
#[repr(C)]
pub struct FfiIguanaResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub server_code: i64,
    pub data_tag: FfiDataTag,
    pub data: *mut std::ffi::c_void,
}

impl FfiIguanaResult {
    fn boxed(
        error_code: FfiErrorCode,
        error_message: *mut c_char,
        http_status: u16,
        server_code: i64,
        data_tag: FfiDataTag,
        data: *mut std::ffi::c_void,
    ) -> *mut Self {
        Box::into_raw(Box::new(FfiIguanaResult {
            error_code,
            error_message,
            http_status,
            server_code,
            data_tag,
            data,
        }))
    }

    /// Build a success result carrying the raw body.
    pub(crate) fn ok_text(body: String) -> *mut Self {
        let data = c_string(body) as *mut std::ffi::c_void;
        Self::boxed(FfiErrorCode::Ok, std::ptr::null_mut(), 0, 0, FfiDataTag::Text, data)
    }

    /// Build a success result carrying an `FfiVersion`.
    pub(crate) fn ok_version(version: Version) -> *mut Self {
        let ffi_version = Box::new(FfiVersion {
            major: version.major,
            minor: version.minor,
            build: version.build,
            build_ext: version.build_ext.clone().map_or(std::ptr::null_mut(), |ext| c_string(ext)),
            display: c_string(version.to_string()),
        });
        let data = Box::into_raw(ffi_version) as *mut std::ffi::c_void;
        Self::boxed(FfiErrorCode::Ok, std::ptr::null_mut(), 0, 0, FfiDataTag::Version, data)
    }

    /// Build a result for a server error envelope.
    pub(crate) fn server_error(code: i64, description: String) -> *mut Self {
        Self::boxed(
            FfiErrorCode::Server,
            c_string(description),
            0,
            code,
            FfiDataTag::None,
            std::ptr::null_mut(),
        )
    }

    /// Build an error result from an `ApiError`.
    pub(crate) fn from_error(err: ApiError) -> *mut Self {
        let http_status = match &err {
            ApiError::Http { status, .. } => *status,
            _ => 0,
        };
        let server_code = match &err {
            ApiError::Server { code, .. } => *code,
            _ => 0,
        };
        Self::boxed(
            FfiErrorCode::from(&err),
            c_string(err.to_string()),
            http_status,
            server_code,
            FfiDataTag::None,
            std::ptr::null_mut(),
        )
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::boxed(
            FfiErrorCode::NullArg,
            c_string(format!("null argument: {name}")),
            0,
            0,
            FfiDataTag::None,
            std::ptr::null_mut(),
        )
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::boxed(FfiErrorCode::Panic, c_string(msg), 0, 0, FfiDataTag::None, std::ptr::null_mut())
    }
}
